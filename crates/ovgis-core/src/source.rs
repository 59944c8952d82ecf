//! Overture Maps releases on the public S3 bucket.
//!
//! Every release is a set of GeoParquet files laid out as
//! `s3://overturemaps-us-west-2/release/<release>/theme=<theme>/type=<type>/`. The bucket
//! allows anonymous reads, so requests are sent unsigned.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use datafusion::execution::SendableRecordBatchStream;
use datafusion::functions::core::expr_fn::get_field;
use datafusion::prelude::{Expr, ParquetReadOptions, SessionConfig, SessionContext, col, lit};
use log::{debug, info};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ClientOptions, ObjectStore};
use ovgis_core_common::{BatchRequest, BatchSource, BoundingBox, OvertureType};
use url::Url;

use crate::error::{Result, SourceError};

/// Public bucket holding every Overture release.
pub const OVERTURE_BUCKET: &str = "overturemaps-us-west-2";

/// Region of [`OVERTURE_BUCKET`].
pub const OVERTURE_REGION: &str = "us-west-2";

/// Prefix under which releases are published.
pub const RELEASE_PREFIX: &str = "release";

/// Column holding each feature's bounding box.
pub const BBOX_COLUMN: &str = "bbox";

/// Options for reading from the Overture bucket.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Release to read. `None` picks the latest published release.
    pub release: Option<String>,
    /// Timeout for establishing a connection
    pub connect_timeout: Option<Duration>,
    /// Timeout for a single request
    pub request_timeout: Option<Duration>,
    /// Maximum rows per record batch
    pub batch_size: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            release: None,
            connect_timeout: None,
            request_timeout: None,
            batch_size: 8192,
        }
    }
}

impl FetchOptions {
    /// Pin a release
    #[must_use]
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
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

    /// Set the batch size
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn client_options(&self) -> ClientOptions {
        let mut client = ClientOptions::new();
        if let Some(timeout) = self.connect_timeout {
            client = client.with_connect_timeout(timeout);
        }
        if let Some(timeout) = self.request_timeout {
            client = client.with_timeout(timeout);
        }
        client
    }
}

/// URL of the bucket root.
#[must_use]
pub fn bucket_url() -> String {
    format!("s3://{OVERTURE_BUCKET}")
}

/// URL of one feature type inside a release.
///
/// ```
/// use ovgis_core::source::dataset_url;
/// use ovgis_core_common::overture::find_overture_type;
///
/// let segment = find_overture_type("segment").unwrap();
/// assert_eq!(
///     dataset_url("2024-11-13.0", &segment),
///     "s3://overturemaps-us-west-2/release/2024-11-13.0/theme=transportation/type=segment/"
/// );
/// ```
#[must_use]
pub fn dataset_url(release: &str, overture_type: &OvertureType) -> String {
    format!(
        "{}/{RELEASE_PREFIX}/{release}/{}/",
        bucket_url(),
        overture_type.partition_prefix()
    )
}

/// Filter keeping rows whose `bbox` struct intersects `bbox`.
#[must_use]
pub fn bbox_filter(bbox: &BoundingBox) -> Expr {
    let edge = |name: &str| get_field(col(BBOX_COLUMN), name);

    edge("xmin")
        .lt_eq(lit(bbox.maxx))
        .and(edge("xmax").gt_eq(lit(bbox.minx)))
        .and(edge("ymin").lt_eq(lit(bbox.maxy)))
        .and(edge("ymax").gt_eq(lit(bbox.miny)))
}

fn build_store(options: &FetchOptions) -> Result<Arc<dyn ObjectStore>> {
    let store = AmazonS3Builder::new()
        .with_bucket_name(OVERTURE_BUCKET)
        .with_region(OVERTURE_REGION)
        .with_skip_signature(true)
        .with_client_options(options.client_options())
        .build()
        .map_err(|source| SourceError::Configure {
            url: bucket_url(),
            source,
        })?;
    Ok(Arc::new(store))
}

/// Release names found directly under the release prefix of `store`, sorted.
///
/// # Errors
///
/// Returns an error if the listing fails.
pub async fn list_releases(store: &dyn ObjectStore) -> Result<Vec<String>> {
    let listing = store
        .list_with_delimiter(Some(&Path::from(RELEASE_PREFIX)))
        .await
        .map_err(SourceError::from)?;

    let mut releases: Vec<String> = listing
        .common_prefixes
        .iter()
        .filter_map(|prefix| prefix.filename().map(str::to_string))
        .collect();
    releases.sort();
    Ok(releases)
}

/// List every published Overture release, oldest first.
///
/// # Errors
///
/// Returns an error if the bucket cannot be reached.
pub async fn get_release_list(options: &FetchOptions) -> Result<Vec<String>> {
    let store = build_store(options)?;
    list_releases(store.as_ref()).await
}

/// Name of the most recent release.
///
/// # Errors
///
/// Returns [`SourceError::NoReleases`] if the bucket holds no releases.
pub async fn latest_release(options: &FetchOptions) -> Result<String> {
    get_release_list(options)
        .await?
        .pop()
        .ok_or_else(|| {
            SourceError::NoReleases {
                bucket: OVERTURE_BUCKET.to_string(),
            }
            .into()
        })
}

/// Stream rows of a parquet dataset whose bounding box intersects `bbox`.
///
/// The object store for `url` must already be registered on `ctx`, unless `url` is a
/// local path.
///
/// # Errors
///
/// Returns an error if the dataset cannot be planned or opened.
pub async fn scan_bbox(
    ctx: &SessionContext,
    url: &str,
    bbox: &BoundingBox,
) -> Result<SendableRecordBatchStream> {
    let frame = ctx
        .read_parquet(url, ParquetReadOptions::default())
        .await
        .map_err(SourceError::from)?
        .filter(bbox_filter(bbox))
        .map_err(SourceError::from)?;

    Ok(frame.execute_stream().await.map_err(SourceError::from)?)
}

/// [`BatchSource`] reading GeoParquet from the Overture bucket.
#[derive(Debug, Clone, Default)]
pub struct OvertureSource {
    options: FetchOptions,
}

impl OvertureSource {
    /// Creates a source with the given options.
    #[must_use]
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    /// Options used for every request.
    #[must_use]
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    async fn open(&self, request: &BatchRequest) -> Result<SendableRecordBatchStream> {
        let mut options = self.options.clone();
        if request.connect_timeout.is_some() {
            options.connect_timeout = request.connect_timeout;
        }
        if request.request_timeout.is_some() {
            options.request_timeout = request.request_timeout;
        }

        let store = build_store(&options)?;
        let release = match &options.release {
            Some(release) => release.clone(),
            None => list_releases(store.as_ref())
                .await?
                .pop()
                .ok_or_else(|| SourceError::NoReleases {
                    bucket: OVERTURE_BUCKET.to_string(),
                })?,
        };

        let url = dataset_url(&release, &request.overture_type);
        info!(
            "Reading '{}' from release {release} within {}",
            request.overture_type, request.bbox
        );
        debug!("Dataset URL: {url}");

        let config = SessionConfig::new().with_batch_size(options.batch_size);
        let ctx = SessionContext::new_with_config(config);
        let root = Url::parse(&bucket_url()).map_err(|err| SourceError::Fetch {
            overture_type: request.overture_type.name.to_string(),
            source: err.into(),
        })?;
        ctx.register_object_store(&root, store);

        scan_bbox(&ctx, &url, &request.bbox).await
    }
}

#[async_trait]
impl BatchSource for OvertureSource {
    async fn record_batches(
        &self,
        request: &BatchRequest,
    ) -> anyhow::Result<SendableRecordBatchStream> {
        self.open(request)
            .await
            .with_context(|| format!("Failed to open '{}' batches", request.overture_type))
    }
}
