//! In-memory implementation of [`FeatureTable`] backed by Arrow arrays.
//!
//! Columns stay as immutable Arrow arrays until they are first written to. A write
//! converts the column into an editable buffer of the written value's field type;
//! [`MemoryTable::to_record_batch`] turns everything back into Arrow.

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use arrow::compute::concat_batches;
use arrow_array::cast::AsArray;
use arrow_array::types::{Float64Type, Int16Type, Int64Type};
use arrow_array::{
    Array, ArrayRef, Float64Array, Int16Array, Int64Array, RecordBatch, RecordBatchOptions,
    StringArray,
};
use arrow_schema::{DataType, Field, FieldRef, Schema, SchemaRef};

use crate::fields::{FieldType, FieldValue};
use crate::io::FeatureTable;

#[derive(Debug, Clone)]
enum Column {
    Arrow(ArrayRef),
    Short(Vec<Option<i16>>),
    Long(Vec<Option<i64>>),
    Double(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    fn empty(field_type: FieldType, len: usize) -> Self {
        match field_type {
            FieldType::Short => Column::Short(vec![None; len]),
            FieldType::Long => Column::Long(vec![None; len]),
            FieldType::Double => Column::Double(vec![None; len]),
            FieldType::Text => Column::Text(vec![None; len]),
        }
    }

    fn thaw(array: &dyn Array, field_type: FieldType) -> Result<Self> {
        let cast = arrow_cast::cast(array, &field_type.to_data_type())?;
        Ok(match field_type {
            FieldType::Short => Column::Short(cast.as_primitive::<Int16Type>().iter().collect()),
            FieldType::Long => Column::Long(cast.as_primitive::<Int64Type>().iter().collect()),
            FieldType::Double => {
                Column::Double(cast.as_primitive::<Float64Type>().iter().collect())
            },
            FieldType::Text => Column::Text(
                cast.as_string::<i32>()
                    .iter()
                    .map(|v| v.map(str::to_owned))
                    .collect(),
            ),
        })
    }

    fn field_type(&self) -> FieldType {
        match self {
            Column::Arrow(array) => FieldType::from_data_type(array.data_type()),
            Column::Short(_) => FieldType::Short,
            Column::Long(_) => FieldType::Long,
            Column::Double(_) => FieldType::Double,
            Column::Text(_) => FieldType::Text,
        }
    }

    fn to_array(&self) -> ArrayRef {
        match self {
            Column::Arrow(array) => Arc::clone(array),
            Column::Short(values) => Arc::new(Int16Array::from(values.clone())),
            Column::Long(values) => Arc::new(Int64Array::from(values.clone())),
            Column::Double(values) => Arc::new(Float64Array::from(values.clone())),
            Column::Text(values) => Arc::new(StringArray::from(values.clone())),
        }
    }

    fn read_text(&self) -> Result<Vec<Option<String>>> {
        fn render<T: ToString>(values: &[Option<T>]) -> Vec<Option<String>> {
            values
                .iter()
                .map(|v| v.as_ref().map(ToString::to_string))
                .collect()
        }

        Ok(match self {
            Column::Arrow(array) => {
                let text = match array.data_type() {
                    DataType::Utf8 => Arc::clone(array),
                    _ => arrow_cast::cast(array.as_ref(), &DataType::Utf8)?,
                };
                text.as_string::<i32>()
                    .iter()
                    .map(|v| v.map(str::to_owned))
                    .collect()
            },
            Column::Short(values) => render(values),
            Column::Long(values) => render(values),
            Column::Double(values) => render(values),
            Column::Text(values) => values.clone(),
        })
    }

    /// Returns `false` when the value does not match the column type.
    fn set(&mut self, row: usize, value: FieldValue) -> bool {
        match (self, value) {
            (Column::Short(values), FieldValue::Short(v)) => values[row] = Some(v),
            (Column::Long(values), FieldValue::Long(v)) => values[row] = Some(v),
            (Column::Double(values), FieldValue::Double(v)) => values[row] = Some(v),
            (Column::Text(values), FieldValue::Text(v)) => values[row] = Some(v),
            (Column::Short(values), FieldValue::Null) => values[row] = None,
            (Column::Long(values), FieldValue::Null) => values[row] = None,
            (Column::Double(values), FieldValue::Null) => values[row] = None,
            (Column::Text(values), FieldValue::Null) => values[row] = None,
            _ => return false,
        }
        true
    }
}

/// An editable attribute table held in memory.
///
/// # Examples
///
/// ```
/// use ovgis_core_common::{FeatureTable, FieldType, FieldValue, MemoryTable};
///
/// let mut table = MemoryTable::with_rows(2);
/// table.add_field("flag", FieldType::Short).unwrap();
/// table.write_value(1, "flag", FieldValue::Short(1)).unwrap();
///
/// let batch = table.to_record_batch().unwrap();
/// assert_eq!(batch.num_rows(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTable {
    fields: Vec<FieldRef>,
    columns: Vec<Column>,
    num_rows: usize,
}

impl MemoryTable {
    /// Creates a table holding the columns of a record batch.
    #[must_use]
    pub fn new(batch: &RecordBatch) -> Self {
        Self {
            fields: batch.schema().fields().iter().cloned().collect(),
            columns: batch.columns().iter().cloned().map(Column::Arrow).collect(),
            num_rows: batch.num_rows(),
        }
    }

    /// Creates a table with no fields and a fixed number of rows.
    #[must_use]
    pub fn with_rows(num_rows: usize) -> Self {
        Self {
            fields: Vec::new(),
            columns: Vec::new(),
            num_rows,
        }
    }

    /// Creates a table from several batches sharing one schema.
    ///
    /// # Errors
    ///
    /// Returns an error if any batch does not match `schema`.
    pub fn try_from_batches(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<Self> {
        let batch = concat_batches(schema, batches)?;
        Ok(Self::new(&batch))
    }

    /// Current schema of the table.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        Arc::new(Schema::new(self.fields.clone()))
    }

    /// Converts the table back into a single record batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns cannot form a valid batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let columns = self.columns.iter().map(Column::to_array).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows));
        Ok(RecordBatch::try_new_with_options(
            self.schema(),
            columns,
            &options,
        )?)
    }

    /// Field type of an existing field.
    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.position(name).map(|idx| self.columns[idx].field_type())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }
}

impl FeatureTable for MemoryTable {
    fn row_count(&self) -> usize {
        self.num_rows
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name().clone()).collect()
    }

    fn read_text(&self, field: &str) -> Result<Vec<Option<String>>> {
        let idx = self
            .position(field)
            .ok_or_else(|| anyhow!("Field '{field}' does not exist"))?;
        self.columns[idx].read_text()
    }

    fn add_field(&mut self, name: &str, field_type: FieldType) -> Result<()> {
        if self.position(name).is_some() {
            bail!("Field '{name}' already exists");
        }
        self.fields
            .push(Arc::new(Field::new(name, field_type.to_data_type(), true)));
        self.columns.push(Column::empty(field_type, self.num_rows));
        Ok(())
    }

    fn write_value(&mut self, row: usize, field: &str, value: FieldValue) -> Result<()> {
        if row >= self.num_rows {
            bail!(
                "Row {row} is out of range for a table with {} rows",
                self.num_rows
            );
        }
        let idx = self
            .position(field)
            .ok_or_else(|| anyhow!("Field '{field}' does not exist"))?;

        if let Column::Arrow(array) = &self.columns[idx] {
            let target = value
                .field_type()
                .unwrap_or_else(|| FieldType::from_data_type(array.data_type()));
            let thawed = Column::thaw(array.as_ref(), target)?;
            self.fields[idx] = Arc::new(Field::new(field, target.to_data_type(), true));
            self.columns[idx] = thawed;
        }

        let expected = self.columns[idx].field_type();
        let found = value.field_type();
        if !self.columns[idx].set(row, value) {
            bail!(
                "Field '{field}' has type {expected}, cannot write a {} value",
                found.map_or("null", |t| t.as_str())
            );
        }
        Ok(())
    }
}
