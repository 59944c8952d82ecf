//! CSV reader for feature classes
//!
//! Column types are inferred from the file contents. Columns whose type cannot be
//! inferred (for example a header-only file) are read as text.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_csv::ReaderBuilder;
use arrow_csv::reader::Format;
use arrow_schema::{DataType, Field, Schema, SchemaRef};

use crate::error::{FeatureClassError, PathContext, Result};

/// Options for reading feature classes
#[derive(Debug, Clone)]
pub struct FeatureClassReaderOptions {
    /// Column delimiter (default: b',')
    pub delimiter: u8,
    /// Number of rows per record batch (default: 8192)
    pub batch_size: usize,
    /// Maximum number of rows used for type inference (default: all)
    pub max_infer_records: Option<usize>,
}

impl Default for FeatureClassReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            batch_size: 8192,
            max_infer_records: None,
        }
    }
}

impl FeatureClassReaderOptions {
    /// Create new reader options with defaults
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

    /// Set batch size
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

fn open(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(FeatureClassError::NotFound {
            path: path.to_path_buf(),
        });
    }
    File::open(path).with_path(path)
}

pub(crate) fn normalize_schema(schema: &Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|field| {
            let data_type = match field.data_type() {
                DataType::Null => DataType::Utf8,
                other => other.clone(),
            };
            Field::new(field.name(), data_type, true)
        })
        .collect();
    Schema::new(fields)
}

/// Inferred schema with untyped columns left as `Null`.
pub(crate) fn infer_raw_schema(path: &Path, options: &FeatureClassReaderOptions) -> Result<Schema> {
    let file = open(path)?;
    let format = Format::default()
        .with_header(true)
        .with_delimiter(options.delimiter);
    let (schema, _) = format
        .infer_schema(BufReader::new(file), options.max_infer_records)
        .with_path(path)?;
    Ok(schema)
}

/// Infer the schema of a feature class file
///
/// # Errors
///
/// Returns an error if the file is missing or is not valid CSV.
pub fn infer_feature_class_schema(
    path: &Path,
    options: &FeatureClassReaderOptions,
) -> Result<SchemaRef> {
    let schema = infer_raw_schema(path, options)?;
    Ok(Arc::new(normalize_schema(&schema)))
}

/// Read a feature class file using a known schema
///
/// # Errors
///
/// Returns an error if the file is missing or a value does not parse as its column type.
pub fn read_feature_class_with_schema(
    path: &Path,
    schema: &SchemaRef,
    options: &FeatureClassReaderOptions,
) -> Result<Vec<RecordBatch>> {
    let file = open(path)?;

    let reader = ReaderBuilder::new(Arc::clone(schema))
        .with_header(true)
        .with_delimiter(options.delimiter)
        .with_batch_size(options.batch_size)
        .build(BufReader::new(file))
        .with_path(path)?;

    reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_path(path)
}

/// Read a feature class file, inferring its schema
///
/// # Errors
///
/// Returns an error if the file is missing or is not valid CSV.
pub fn read_feature_class(
    path: &Path,
    options: &FeatureClassReaderOptions,
) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let schema = infer_feature_class_schema(path, options)?;
    let batches = read_feature_class_with_schema(path, &schema, options)?;
    log::debug!(
        "Read {} rows from {}",
        batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
        path.display()
    );
    Ok((schema, batches))
}

/// Widen two inferred column types to one that can hold values of both.
#[must_use]
pub fn widen_data_type(left: &DataType, right: &DataType) -> DataType {
    match (left, right) {
        (l, r) if l == r => l.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        },
        _ => DataType::Utf8,
    }
}
