//! I/O traits for fetching Overture batches and editing persisted tables.
//!
//! These are the seams between the conversion core and its collaborators: the remote
//! batch source on one side and the persisted feature table on the other.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use datafusion::execution::SendableRecordBatchStream;

use crate::bbox::BoundingBox;
use crate::fields::{FieldType, FieldValue};
use crate::overture::OvertureType;

/// A request for one feature type inside a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    /// Feature type to fetch.
    pub overture_type: OvertureType,
    /// Area of interest.
    pub bbox: BoundingBox,
    /// Timeout for establishing a connection to the remote store.
    pub connect_timeout: Option<Duration>,
    /// Timeout for a single request to the remote store.
    pub request_timeout: Option<Duration>,
}

impl BatchRequest {
    /// Creates a request without timeouts.
    #[must_use]
    pub fn new(overture_type: OvertureType, bbox: BoundingBox) -> Self {
        Self {
            overture_type,
            bbox,
            connect_timeout: None,
            request_timeout: None,
        }
    }

    /// Set the connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Trait for sources of Overture record batches.
///
/// Implementations produce a lazy, finite stream of batches. Batches may have zero rows;
/// consumers treat every batch as an independent unit.
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Opens a stream of batches for the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote data cannot be located or opened.
    async fn record_batches(&self, request: &BatchRequest) -> Result<SendableRecordBatchStream>;
}

/// Minimal accessor for a persisted attribute table.
///
/// Rows are addressed by zero-based position. Implementations are not required to be
/// transactional: a failure part way through a sequence of edits leaves earlier edits in
/// place.
pub trait FeatureTable {
    /// Number of rows in the table.
    fn row_count(&self) -> usize;

    /// Names of all fields, in schema order.
    fn field_names(&self) -> Vec<String>;

    /// Returns `true` if a field with this exact name exists.
    fn has_field(&self, name: &str) -> bool {
        self.field_names().iter().any(|f| f == name)
    }

    /// Reads every row of a field as text. Nulls are `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the field does not exist or cannot be rendered as text.
    fn read_text(&self, field: &str) -> Result<Vec<Option<String>>>;

    /// Appends a new field. Existing rows receive the field's default (null).
    ///
    /// # Errors
    ///
    /// Returns an error if a field with this name already exists.
    fn add_field(&mut self, name: &str, field_type: FieldType) -> Result<()>;

    /// Writes one cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the row or field does not exist, or the value does not fit
    /// the field type.
    fn write_value(&mut self, row: usize, field: &str, value: FieldValue) -> Result<()>;
}
