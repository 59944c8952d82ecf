//! Workspaces: directories that hold feature classes by name.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::{Field, Schema, SchemaRef};
use tempfile::TempDir;

use crate::error::{FeatureClassError, PathContext, Result};
use crate::reader::{
    FeatureClassReaderOptions, infer_raw_schema, normalize_schema, read_feature_class_with_schema,
    widen_data_type,
};
use crate::writer::{FeatureClassWriterOptions, write_feature_class};

/// File extension of a feature class inside a workspace.
pub const FEATURE_CLASS_EXTENSION: &str = "csv";

/// A directory of feature classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).with_path(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the feature class called `name`.
    #[must_use]
    pub fn feature_class_path(&self, name: &str) -> PathBuf {
        self.root
            .join(name)
            .with_extension(FEATURE_CLASS_EXTENSION)
    }

    /// Returns `true` if a feature class called `name` exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.feature_class_path(name).is_file()
    }

    /// Names of all feature classes, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).with_path(&self.root)? {
            let path = entry.with_path(&self.root)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FEATURE_CLASS_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Write record batches as the feature class `name`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the feature class cannot be written.
    pub fn write(
        &self,
        name: &str,
        schema: &SchemaRef,
        batches: &[RecordBatch],
        options: &FeatureClassWriterOptions,
    ) -> Result<PathBuf> {
        let path = self.feature_class_path(name);
        write_feature_class(&path, schema, batches, options)?;
        Ok(path)
    }

    /// Delete the feature class `name` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.feature_class_path(name);
        if path.exists() {
            fs::remove_file(&path).with_path(&path)?;
        }
        Ok(())
    }
}

/// A workspace in a temporary directory that is removed on drop.
#[derive(Debug)]
pub struct TempWorkspace {
    // Held so the directory lives as long as the workspace.
    _dir: TempDir,
    workspace: Workspace,
}

impl TempWorkspace {
    /// Create a new temporary workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("ovgis-")
            .tempdir()
            .with_path(std::env::temp_dir())?;
        let workspace = Workspace {
            root: dir.path().to_path_buf(),
        };
        log::debug!("Created temporary workspace {}", workspace.root.display());
        Ok(Self {
            _dir: dir,
            workspace,
        })
    }

    /// The underlying workspace.
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

fn merged_schema(inputs: &[PathBuf], options: &FeatureClassReaderOptions) -> Result<SchemaRef> {
    let mut merged: Option<Vec<Field>> = None;

    for path in inputs {
        let schema = infer_raw_schema(path, options)?;
        match merged.as_mut() {
            None => {
                merged = Some(schema.fields().iter().map(|f| f.as_ref().clone()).collect());
            },
            Some(fields) => {
                let same_names = fields.len() == schema.fields().len()
                    && fields
                        .iter()
                        .zip(schema.fields())
                        .all(|(a, b)| a.name() == b.name());
                if !same_names {
                    return Err(FeatureClassError::SchemaMismatch { path: path.clone() });
                }
                for (field, other) in fields.iter_mut().zip(schema.fields()) {
                    let widened = widen_data_type(field.data_type(), other.data_type());
                    *field = Field::new(field.name(), widened, true);
                }
            },
        }
    }

    let schema = Schema::new(merged.unwrap_or_default());
    Ok(Arc::new(normalize_schema(&schema)))
}

/// Merge feature classes with identical columns into one output feature class.
///
/// Column types are widened where the inputs disagree (for example a column that is
/// empty in one input). Returns the number of rows written.
///
/// # Errors
///
/// Returns an error if `inputs` is empty, the inputs have different columns, or any file
/// cannot be read or written.
pub fn merge_feature_classes(inputs: &[PathBuf], output: &Path) -> Result<usize> {
    if inputs.is_empty() {
        return Err(FeatureClassError::Table(anyhow::anyhow!(
            "At least one feature class is required to merge"
        )));
    }

    let read_options = FeatureClassReaderOptions::default();
    let schema = merged_schema(inputs, &read_options)?;

    let mut batches = Vec::new();
    for path in inputs {
        batches.extend(read_feature_class_with_schema(path, &schema, &read_options)?);
    }

    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    write_feature_class(
        output,
        &schema,
        &batches,
        &FeatureClassWriterOptions::default(),
    )?;
    log::info!(
        "Merged {} feature classes into {} ({rows} rows)",
        inputs.len(),
        output.display()
    );
    Ok(rows)
}
