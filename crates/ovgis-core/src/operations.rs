//! Fetch Overture data and convert it for GIS use.
//!
//! Every operation validates its inputs before talking to the [`BatchSource`], then
//! consumes the batch stream one batch at a time, skipping empty batches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arrow_array::RecordBatch;
use featureclass_csv::{
    FeatureClass, FeatureClassWriterOptions, TempWorkspace, merge_feature_classes,
    write_feature_class,
};
use futures::TryStreamExt;
use log::{debug, info, warn};
use ovgis_core_common::overture::find_overture_type;
use ovgis_core_common::{
    BatchRequest, BatchSource, CoordinateValue, OvertureType, validate_bounding_box,
};

use crate::error::{Result, SourceError, invalid_overture_type};
use crate::flatten::{convert_complex_columns_to_strings, flattened_schema};
use crate::materialize::{MaterializeSummary, add_boolean_access_restrictions_fields};
use crate::spatial::{SpatialTable, SpatialTableOptions, table_to_spatial_table};

/// Timeouts applied to remote requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// Timeout for establishing a connection
    pub connect: Option<Duration>,
    /// Timeout for a single request
    pub request: Option<Duration>,
}

impl Timeouts {
    /// Set the connect timeout
    #[must_use]
    pub fn with_connect(mut self, timeout: Duration) -> Self {
        self.connect = Some(timeout);
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_request(mut self, timeout: Duration) -> Self {
        self.request = Some(timeout);
        self
    }
}

/// Look up an Overture type by name.
///
/// # Errors
///
/// Returns a validation error listing every valid type if `name` is unknown.
pub fn validate_overture_type(name: &str) -> Result<OvertureType> {
    find_overture_type(name).ok_or_else(|| invalid_overture_type(name).into())
}

/// Validate a feature type and bounding box into a batch request.
///
/// # Errors
///
/// Returns a validation error for an unknown type or a malformed bounding box.
pub fn build_request<T: CoordinateValue>(
    overture_type: &str,
    bbox: &[T],
    timeouts: Timeouts,
) -> Result<BatchRequest> {
    let overture_type = validate_overture_type(overture_type)?;
    let bbox = validate_bounding_box(bbox)?;
    Ok(BatchRequest::new(overture_type, bbox)
        .with_connect_timeout(timeouts.connect)
        .with_request_timeout(timeouts.request))
}

fn warn_no_data(request: &BatchRequest) {
    warn!(
        "No '{}' data found for the specified bounding box: {}",
        request.overture_type, request.bbox
    );
}

/// Fetch features into an in-memory spatial table.
///
/// Returns an empty table, and logs a warning, when nothing intersects the bounding box.
///
/// # Errors
///
/// Returns an error if validation fails, the source cannot be read, or a batch cannot be
/// converted.
pub async fn get_spatial_table<T: CoordinateValue>(
    source: &dyn BatchSource,
    overture_type: &str,
    bbox: &[T],
    timeouts: Timeouts,
) -> Result<SpatialTable> {
    let request = build_request(overture_type, bbox, timeouts)?;
    let options = SpatialTableOptions::default();

    let mut stream = source
        .record_batches(&request)
        .await
        .map_err(|err| SourceError::Fetch {
            overture_type: request.overture_type.name.to_string(),
            source: err,
        })?;

    let mut table = SpatialTable::empty(
        Arc::new(flattened_schema(&stream.schema())),
        options.geometry_column_name.clone(),
    );
    let mut index = 0_usize;
    while let Some(batch) = stream.try_next().await.map_err(SourceError::from)? {
        index += 1;
        if batch.num_rows() == 0 {
            debug!("Skipping empty batch {index}");
            continue;
        }
        debug!("Converting batch {index} ({} rows)", batch.num_rows());
        table.append(table_to_spatial_table(&batch, &options)?)?;
    }

    if table.is_empty() {
        warn_no_data(&request);
    } else {
        info!(
            "Fetched {} '{}' feature(s) in {index} batch(es)",
            table.num_rows(),
            request.overture_type
        );
    }
    Ok(table)
}

/// Write one batch to a feature class at `output`.
///
/// Nested columns are flattened to JSON text and WKB geometries are written as WKT.
///
/// # Errors
///
/// Returns an error if the batch cannot be flattened or the file cannot be written.
pub fn table_to_features(batch: &RecordBatch, output: &Path) -> Result<PathBuf> {
    let flat = convert_complex_columns_to_strings(batch)?;
    write_feature_class(
        output,
        &flat.schema(),
        std::slice::from_ref(&flat),
        &FeatureClassWriterOptions::default(),
    )?;
    Ok(output.to_path_buf())
}

/// Fetch features into a feature class at `output`.
///
/// Each non-empty batch is written to its own feature class in a temporary workspace, and
/// those are merged into `output`. When nothing intersects the bounding box a feature
/// class with a header and no rows is written and a warning is logged.
///
/// # Errors
///
/// Returns an error if validation fails, the source cannot be read, or a feature class
/// cannot be written or merged.
pub async fn get_features<T: CoordinateValue>(
    source: &dyn BatchSource,
    output: &Path,
    overture_type: &str,
    bbox: &[T],
    timeouts: Timeouts,
) -> Result<PathBuf> {
    let request = build_request(overture_type, bbox, timeouts)?;

    let mut stream = source
        .record_batches(&request)
        .await
        .map_err(|err| SourceError::Fetch {
            overture_type: request.overture_type.name.to_string(),
            source: err,
        })?;
    let schema = Arc::new(flattened_schema(&stream.schema()));

    let temp = TempWorkspace::new()?;
    let mut parts = Vec::new();
    let mut index = 0_usize;
    while let Some(batch) = stream.try_next().await.map_err(SourceError::from)? {
        if batch.num_rows() == 0 {
            debug!("Skipping empty batch {index}");
            index += 1;
            continue;
        }
        let name = format!("overture_{}_{index:04}", request.overture_type);
        let path = table_to_features(&batch, &temp.workspace().feature_class_path(&name))?;
        debug!("Wrote batch {index} ({} rows) to {name}", batch.num_rows());
        parts.push(path);
        index += 1;
    }

    if parts.is_empty() {
        warn_no_data(&request);
        write_feature_class(output, &schema, &[], &FeatureClassWriterOptions::default())?;
        return Ok(output.to_path_buf());
    }

    let rows = merge_feature_classes(&parts, output)?;
    info!(
        "Wrote {rows} '{}' feature(s) to {}",
        request.overture_type,
        output.display()
    );
    Ok(output.to_path_buf())
}

/// Add boolean access restriction fields to the feature class at `path`.
///
/// # Errors
///
/// Returns an error if the feature class cannot be opened, the column is missing or
/// malformed, or the result cannot be saved.
pub fn add_access_restriction_fields(path: &Path, column: &str) -> Result<MaterializeSummary> {
    let mut feature_class = FeatureClass::open(path)?;
    let summary = add_boolean_access_restrictions_fields(&mut feature_class, column)?;
    if !summary.keys.is_empty() {
        feature_class.save()?;
    }
    Ok(summary)
}
