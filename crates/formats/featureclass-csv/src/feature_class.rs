//! Editable handle to a feature class file.

use std::path::{Path, PathBuf};

use anyhow::Result as AnyResult;
use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use ovgis_core_common::{FeatureTable, FieldType, FieldValue, MemoryTable};

use crate::error::Result;
use crate::reader::{FeatureClassReaderOptions, read_feature_class};
use crate::writer::{FeatureClassWriterOptions, write_feature_class};

/// A feature class loaded into memory.
///
/// Edits go through the [`FeatureTable`] implementation and are persisted with
/// [`FeatureClass::save`].
#[derive(Debug, Clone)]
pub struct FeatureClass {
    path: PathBuf,
    table: MemoryTable,
}

impl FeatureClass {
    /// Open an existing feature class.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (schema, batches) = read_feature_class(path, &FeatureClassReaderOptions::default())?;
        let table = MemoryTable::try_from_batches(&schema, &batches)?;
        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    /// Create (or replace) a feature class from record batches.
    ///
    /// Geometries in the `options` geometry column are stored as WKT.
    ///
    /// # Errors
    ///
    /// Returns an error if the batches cannot be written.
    pub fn create(
        path: impl AsRef<Path>,
        schema: &SchemaRef,
        batches: &[RecordBatch],
        options: &FeatureClassWriterOptions,
    ) -> Result<()> {
        write_feature_class(path.as_ref(), schema, batches, options)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of features.
    #[must_use]
    pub fn count(&self) -> usize {
        self.table.row_count()
    }

    /// Current schema, including unsaved edits.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.table.schema()
    }

    /// All features as a single batch, including unsaved edits.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns cannot be assembled into a batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        Ok(self.table.to_record_batch()?)
    }

    /// Write the current contents back to the backing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let batch = self.to_record_batch()?;
        write_feature_class(
            &self.path,
            &batch.schema(),
            &[batch],
            &FeatureClassWriterOptions::default(),
        )
    }
}

impl FeatureTable for FeatureClass {
    fn row_count(&self) -> usize {
        self.table.row_count()
    }

    fn field_names(&self) -> Vec<String> {
        self.table.field_names()
    }

    fn read_text(&self, field: &str) -> AnyResult<Vec<Option<String>>> {
        self.table.read_text(field)
    }

    fn add_field(&mut self, name: &str, field_type: FieldType) -> AnyResult<()> {
        self.table.add_field(name, field_type)
    }

    fn write_value(&mut self, row: usize, field: &str, value: FieldValue) -> AnyResult<()> {
        self.table.write_value(row, field, value)
    }
}
