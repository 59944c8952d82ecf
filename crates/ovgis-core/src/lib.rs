//! `ovgis-core` fetches Overture Maps features and shapes them for desktop GIS use.
//!
//! This crate includes:
//! - **Flattening**: nested struct, list and map columns become JSON text columns
//!   ([`flatten`], [`value`]).
//! - **Access restrictions**: nested restriction rules become boolean key sets
//!   ([`access`]) and boolean fields on a feature table ([`materialize`]).
//! - **Spatial tables**: batches with a decoded GeoArrow geometry column ([`spatial`]).
//! - **Remote source**: GeoParquet releases on the public Overture bucket ([`source`]).
//! - **Operations**: the end-to-end conversions used by the CLI ([`operations`]).

pub mod access;
pub mod error;
pub mod flatten;
pub mod materialize;
pub mod operations;
pub mod source;
pub mod spatial;
pub mod types;
pub mod utils;
pub mod value;

pub use error::{OvertureError, Result};
pub use operations::{
    Timeouts, add_access_restriction_fields, get_features, get_spatial_table, table_to_features,
    validate_overture_type,
};
pub use source::{FetchOptions, OvertureSource, get_release_list, latest_release};
pub use spatial::{SpatialTable, SpatialTableOptions, table_to_spatial_table};
