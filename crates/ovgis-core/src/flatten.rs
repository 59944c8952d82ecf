//! Complex column flattening.
//!
//! GIS attribute tables cannot hold nested values, so every struct, list and map column
//! is replaced by a text column holding each row's value as JSON. Null rows become the
//! literal text `null`.

use std::sync::Arc;

use arrow_array::builder::StringBuilder;
use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_schema::{ArrowError, DataType, Field, FieldRef, Schema};
use log::debug;

use crate::value::ColumnValue;

/// Text written for a null nested value.
pub const NULL_JSON: &str = "null";

/// Returns `true` for nested data types that are flattened to JSON text.
#[must_use]
pub fn is_complex_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Struct(_)
            | DataType::List(_)
            | DataType::LargeList(_)
            | DataType::FixedSizeList(_, _)
            | DataType::ListView(_)
            | DataType::LargeListView(_)
            | DataType::Map(_, _)
    )
}

/// Serialize every row of a nested column to JSON text.
///
/// # Errors
///
/// Returns an error if a row cannot be read or serialized.
pub fn complex_column_to_strings(array: &dyn Array) -> Result<ArrayRef, ArrowError> {
    let mut builder = StringBuilder::with_capacity(array.len(), array.len() * 16);

    for row in 0..array.len() {
        match ColumnValue::from_array(array, row)? {
            ColumnValue::Null => builder.append_value(NULL_JSON),
            value => {
                let json = value
                    .to_json()
                    .map_err(|err| ArrowError::JsonError(err.to_string()))?;
                builder.append_value(json);
            },
        }
    }

    Ok(Arc::new(builder.finish()))
}

/// Replace every nested column of a batch with a JSON text column.
///
/// Primitive columns, including their field metadata, are passed through untouched.
/// Column order is preserved. The input batch is not modified.
///
/// # Errors
///
/// Returns an error if a nested value cannot be serialized.
pub fn convert_complex_columns_to_strings(batch: &RecordBatch) -> Result<RecordBatch, ArrowError> {
    let schema = batch.schema();
    if !schema.fields().iter().any(|f| is_complex_type(f.data_type())) {
        return Ok(batch.clone());
    }

    let mut columns = Vec::with_capacity(batch.num_columns());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if is_complex_type(field.data_type()) {
            debug!("Flattening column '{}' ({})", field.name(), field.data_type());
            columns.push(complex_column_to_strings(column.as_ref())?);
        } else {
            columns.push(Arc::clone(column));
        }
    }

    RecordBatch::try_new(Arc::new(flattened_schema(&schema)), columns)
}

/// The schema [`convert_complex_columns_to_strings`] produces for batches of `schema`.
#[must_use]
pub fn flattened_schema(schema: &Schema) -> Schema {
    let fields: Vec<FieldRef> = schema
        .fields()
        .iter()
        .map(|field| {
            if is_complex_type(field.data_type()) {
                Arc::new(Field::new(field.name(), DataType::Utf8, field.is_nullable()))
            } else {
                Arc::clone(field)
            }
        })
        .collect();
    Schema::new_with_metadata(fields, schema.metadata().clone())
}
