//! Custom error types for `ovgis` operations.
//!
//! Validation errors carry fixed messages so callers can match on them. Everything else
//! wraps the error of the collaborator that failed.

use arrow_schema::ArrowError;
use featureclass_csv::FeatureClassError;
use ovgis_core_common::BoundingBoxError;
use ovgis_core_common::overture::get_all_overture_types;
use thiserror::Error;

/// Main error type for `ovgis` operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum OvertureError {
    /// Invalid input (unknown type, malformed bounding box)
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Remote source errors (listing releases, reading parquet)
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Spatial table construction errors
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// Feature class read/write errors
    #[error(transparent)]
    FeatureClass(#[from] FeatureClassError),

    /// Malformed access restriction rules
    #[error(transparent)]
    AccessRule(#[from] AccessRuleError),

    /// Arrow compute or serialization errors
    #[error(transparent)]
    Arrow(#[from] ArrowError),

    /// Errors from collaborators that only report `anyhow` errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Input validation errors.
///
/// These are raised before any remote or persisted I/O takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The requested Overture type is not in the registry
    #[error("Invalid overture type: {overture_type}. Valid types are: {valid:?}")]
    InvalidType {
        /// The requested type
        overture_type: String,
        /// All registered type names
        valid: Vec<&'static str>,
    },

    /// The bounding box is malformed
    #[error(transparent)]
    BoundingBox(#[from] BoundingBoxError),
}

/// Errors raised while talking to the remote Overture release bucket.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The object store client could not be built
    #[error("Failed to configure object store for '{url}': {source}")]
    Configure {
        /// Bucket URL
        url: String,
        /// The underlying error
        #[source]
        source: object_store::Error,
    },

    /// Listing objects in the bucket failed
    #[error("Failed to list Overture releases: {0}")]
    List(#[from] object_store::Error),

    /// The bucket holds no release prefixes
    #[error("No Overture releases found in '{bucket}'")]
    NoReleases {
        /// Bucket name
        bucket: String,
    },

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    Query(#[from] datafusion::error::DataFusionError),

    /// Opening the batch stream failed
    #[error("Failed to fetch '{overture_type}' data from Overture Maps: {source}")]
    Fetch {
        /// The requested Overture type
        overture_type: String,
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised while building spatial tables.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// No geometry column could be identified
    #[error("No geometry column found. Available columns: {available}")]
    MissingGeometryColumn {
        /// Comma-separated list of column names
        available: String,
    },

    /// The geometry column could not be decoded
    #[error("Failed to decode geometry column '{column}': {message}")]
    GeometryDecode {
        /// Geometry column name
        column: String,
        /// Description of the problem
        message: String,
    },

    /// Appended batches do not share a schema
    #[error("Cannot append batch: schema does not match the spatial table")]
    SchemaMismatch,
}

/// Access restriction rule errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessRuleError {
    /// A rule was not an object, a list of rules or null
    #[error("Access restriction rule must be an object, a list of rules or null, found {found}")]
    NotARule {
        /// JSON type of the offending value
        found: &'static str,
    },
}

/// Type alias for Results using `OvertureError`.
pub type Result<T> = std::result::Result<T, OvertureError>;

impl OvertureError {
    /// Get a user-friendly error message with suggestions.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.user_message(),
            Self::Source(e) => format!("Overture Maps request failed: {e}"),
            Self::Spatial(e) => format!("Spatial table error: {e}"),
            Self::FeatureClass(e) => format!("Feature class error: {e}"),
            Self::AccessRule(e) => format!("Access restriction error: {e}"),
            Self::Arrow(e) => format!("Data conversion error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    ///
    /// Returns helpful suggestions on how to fix or work around the error.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Validation(e) => e.recovery_suggestion(),
            Self::Source(SourceError::NoReleases { .. }) => {
                Some("Run 'ovgis releases' to check which releases are published.".to_string())
            },
            Self::Source(_) => Some(
                "Check your network connection, or raise --connect-timeout/--request-timeout."
                    .to_string(),
            ),
            Self::FeatureClass(FeatureClassError::NotFound { .. }) => Some(
                "Check that the feature class path is correct and the file exists.".to_string(),
            ),
            _ => None,
        }
    }

    /// Returns `true` for input validation failures.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<BoundingBoxError> for OvertureError {
    fn from(err: BoundingBoxError) -> Self {
        Self::Validation(ValidationError::BoundingBox(err))
    }
}

impl ValidationError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidType { overture_type, valid } => {
                format!(
                    "Invalid overture type: {overture_type}.\n\nValid types are:\n{}",
                    valid
                        .iter()
                        .map(|t| format!("  - {t}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            },
            Self::BoundingBox(_) => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::InvalidType { .. } => {
                Some("Run 'ovgis types' to see all available Overture types.".to_string())
            },
            Self::BoundingBox(BoundingBoxError::Order) => Some(
                "Pass the bounding box as minx,miny,maxx,maxy with minx < maxx and miny < maxy."
                    .to_string(),
            ),
            Self::BoundingBox(_) => Some(
                "Pass the bounding box as four numbers: minx,miny,maxx,maxy (EPSG:4326)."
                    .to_string(),
            ),
        }
    }
}

/// Helper to create `ValidationError::InvalidType` listing every registered type.
#[must_use]
pub fn invalid_overture_type(name: &str) -> ValidationError {
    ValidationError::InvalidType {
        overture_type: name.to_string(),
        valid: get_all_overture_types(),
    }
}
