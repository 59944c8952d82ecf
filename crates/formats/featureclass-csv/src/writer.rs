//! CSV writer for feature classes

use std::fs::File;
use std::io::{BufWriter, Write as IoWrite};
use std::path::Path;

use arrow_array::RecordBatch;
use arrow_csv::WriterBuilder;
use arrow_schema::SchemaRef;

use crate::error::{PathContext, Result};
use crate::geospatial::prepare_batch;

/// Default name of the geometry column in a feature class.
pub const DEFAULT_GEOMETRY_COLUMN: &str = "geometry";

/// Options for writing feature classes
#[derive(Debug, Clone)]
pub struct FeatureClassWriterOptions {
    /// Column delimiter (default: b',')
    pub delimiter: u8,
    /// Whether to write header row (default: true)
    pub has_header: bool,
    /// Null value representation (default: empty string)
    pub null_value: String,
    /// Name of the geometry column to encode as WKT (default: "geometry")
    pub geometry_column_name: String,
}

impl Default for FeatureClassWriterOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_value: String::new(),
            geometry_column_name: DEFAULT_GEOMETRY_COLUMN.to_string(),
        }
    }
}

impl FeatureClassWriterOptions {
    /// Create new writer options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set column delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether to write header row
    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set null value representation
    #[must_use]
    pub fn with_null_value(mut self, null_value: impl Into<String>) -> Self {
        self.null_value = null_value.into();
        self
    }

    /// Set the geometry column name
    #[must_use]
    pub fn with_geometry_column(mut self, name: impl Into<String>) -> Self {
        self.geometry_column_name = name.into();
        self
    }
}

/// Write record batches as feature class rows
///
/// The header is derived from `schema`, so an empty `batches` slice still produces a
/// header-only file.
///
/// # Errors
///
/// Returns an error if a geometry cannot be encoded, a column is nested, or writing to
/// the output fails.
pub fn write_features<W: IoWrite>(
    writer: &mut W,
    schema: &SchemaRef,
    batches: &[RecordBatch],
    options: &FeatureClassWriterOptions,
) -> Result<()> {
    let mut builder = WriterBuilder::new()
        .with_delimiter(options.delimiter)
        .with_header(options.has_header);
    if !options.null_value.is_empty() {
        builder = builder.with_null(options.null_value.clone());
    }

    let mut csv_writer = builder.build(writer);

    let empty = RecordBatch::new_empty(schema.clone());
    let header_only = [empty];
    let batches = if batches.is_empty() {
        &header_only[..]
    } else {
        batches
    };

    for batch in batches {
        let prepared = prepare_batch(batch, &options.geometry_column_name)?;
        csv_writer.write(&prepared)?;
    }

    Ok(())
}

/// Write record batches to CSV bytes
///
/// # Errors
///
/// Returns an error if CSV serialization fails
pub fn write_features_to_bytes(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    options: &FeatureClassWriterOptions,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_features(&mut buffer, schema, batches, options)?;
    Ok(buffer)
}

/// Write record batches to a feature class file, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or the batches cannot be written.
pub fn write_feature_class(
    path: &Path,
    schema: &SchemaRef,
    batches: &[RecordBatch],
    options: &FeatureClassWriterOptions,
) -> Result<()> {
    let file = File::create(path).with_path(path)?;
    let mut writer = BufWriter::new(file);
    write_features(&mut writer, schema, batches, options)?;
    writer.flush().with_path(path)?;
    log::debug!(
        "Wrote {} rows to {}",
        batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{ArrayRef, BinaryArray, BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow_schema::{DataType, Field, Schema};
    use std::sync::Arc;

    fn point_wkb(x: f64, y: f64) -> Vec<u8> {
        let mut bytes = vec![1_u8];
        bytes.extend_from_slice(&1_u32.to_le_bytes());
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
        bytes
    }

    fn create_test_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("value", DataType::Float64, true),
            Field::new("active", DataType::Boolean, true),
        ]));

        let id_array: ArrayRef = Arc::new(Int64Array::from(vec![1, 2, 3]));
        let name_array: ArrayRef =
            Arc::new(StringArray::from(vec![Some("Alice"), Some("Bob"), None]));
        let value_array: ArrayRef =
            Arc::new(Float64Array::from(vec![Some(10.5), None, Some(30.2)]));
        let active_array: ArrayRef = Arc::new(BooleanArray::from(vec![
            Some(true),
            Some(false),
            Some(true),
        ]));

        RecordBatch::try_new(
            schema,
            vec![id_array, name_array, value_array, active_array],
        )
        .unwrap()
    }

    #[test]
    fn test_write_with_header() {
        let batch = create_test_batch();
        let options = FeatureClassWriterOptions::default();

        let result = write_features_to_bytes(&batch.schema(), &[batch], &options).unwrap();
        let csv_str = String::from_utf8(result).unwrap();

        assert!(csv_str.starts_with("id,name,value,active\n"));
        assert!(csv_str.contains("1,Alice,10.5,true"));
        assert!(csv_str.contains("2,Bob,,false"));
        assert!(csv_str.contains("3,,30.2,true"));
    }

    #[test]
    fn test_write_custom_delimiter_and_null() {
        let batch = create_test_batch();
        let options = FeatureClassWriterOptions::default()
            .with_delimiter(b';')
            .with_null_value("NULL");

        let result = write_features_to_bytes(&batch.schema(), &[batch], &options).unwrap();
        let csv_str = String::from_utf8(result).unwrap();

        assert!(csv_str.starts_with("id;name;value;active\n"));
        assert!(csv_str.contains("2;Bob;NULL;false"));
    }

    #[test]
    fn test_write_empty_input_writes_header() {
        let schema = create_test_batch().schema();
        let options = FeatureClassWriterOptions::default();

        let result = write_features_to_bytes(&schema, &[], &options).unwrap();
        assert_eq!(String::from_utf8(result).unwrap(), "id,name,value,active\n");
    }

    #[test]
    fn test_write_multiple_batches() {
        let batch = create_test_batch();
        let options = FeatureClassWriterOptions::default();

        let result =
            write_features_to_bytes(&batch.schema(), &[batch.clone(), batch], &options).unwrap();
        let csv_str = String::from_utf8(result).unwrap();

        assert_eq!(csv_str.matches("id,name,value,active").count(), 1);
        assert_eq!(csv_str.lines().count(), 7);
    }

    #[test]
    fn test_write_geometry_as_wkt() {
        let wkb = point_wkb(10.0, 20.0);
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("geom", DataType::Binary, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["p1"])),
                Arc::new(BinaryArray::from(vec![Some(wkb.as_slice())])),
            ],
        )
        .unwrap();
        let options = FeatureClassWriterOptions::default().with_geometry_column("geom");

        let result = write_features_to_bytes(&schema, &[batch], &options).unwrap();
        let csv_str = String::from_utf8(result).unwrap();
        assert_eq!(csv_str, "id,geom\np1,POINT(10 20)\n");
    }
}
