//! Errors raised while reading, writing or merging feature classes.

use std::path::PathBuf;

use arrow_schema::ArrowError;
use thiserror::Error;

/// Errors that can occur when working with CSV-backed feature classes.
#[derive(Debug, Error)]
pub enum FeatureClassError {
    /// An underlying filesystem operation failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The file or directory involved
        path: PathBuf,
        /// The originating error
        #[source]
        source: std::io::Error,
    },

    /// Arrow failed to encode or decode CSV data.
    #[error("CSV error on '{path}': {source}")]
    Csv {
        /// The feature class file
        path: PathBuf,
        /// The originating error
        #[source]
        source: ArrowError,
    },

    /// A geometry value could not be encoded.
    #[error("Invalid geometry in column '{column}' at row {row}: {message}")]
    Geometry {
        /// Geometry column name
        column: String,
        /// Zero-based row index
        row: usize,
        /// Description of the problem
        message: String,
    },

    /// A column type has no flat CSV representation.
    #[error("Column '{column}' has type {data_type}, which cannot be stored in a feature class")]
    UnsupportedColumn {
        /// Column name
        column: String,
        /// Arrow type of the column
        data_type: String,
    },

    /// Feature classes being merged do not share a schema.
    #[error("Feature class '{path}' does not match the schema of the first input")]
    SchemaMismatch {
        /// The offending input
        path: PathBuf,
    },

    /// The feature class does not exist.
    #[error("Feature class not found: '{path}'")]
    NotFound {
        /// The missing path
        path: PathBuf,
    },

    /// Arrow failed to build or encode a batch.
    #[error(transparent)]
    Arrow(#[from] ArrowError),

    /// An in-memory table operation failed.
    #[error(transparent)]
    Table(#[from] anyhow::Error),
}

/// Type alias for Results using [`FeatureClassError`].
pub type Result<T> = std::result::Result<T, FeatureClassError>;

/// Extension trait for attaching a path to I/O and Arrow errors.
pub(crate) trait PathContext<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> PathContext<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| FeatureClassError::Io {
            path: path.into(),
            source,
        })
    }
}

impl<T> PathContext<T> for std::result::Result<T, ArrowError> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| FeatureClassError::Csv {
            path: path.into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_geometry_error() {
        let error = FeatureClassError::Geometry {
            column: "geometry".to_string(),
            row: 3,
            message: "truncated WKB".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid geometry in column 'geometry' at row 3: truncated WKB"
        );
    }

    #[test]
    fn io_context_keeps_path() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk full"));
        let err = result.with_path("/tmp/out.csv").unwrap_err();
        assert_eq!(err.to_string(), "I/O error on '/tmp/out.csv': disk full");
    }
}
