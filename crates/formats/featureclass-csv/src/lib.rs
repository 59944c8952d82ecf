//! CSV-backed feature classes and workspaces.
//!
//! A feature class is a CSV file with a header row, one row per feature and its geometry
//! stored as WKT. A workspace is a directory of feature classes addressed by name.

pub mod error;
pub mod feature_class;
pub mod geospatial;
pub mod reader;
pub mod workspace;
pub mod writer;

pub use error::{FeatureClassError, Result};
pub use feature_class::FeatureClass;
pub use geospatial::{encode_geometry_column, is_flat_type, prepare_batch};
pub use reader::{
    FeatureClassReaderOptions, infer_feature_class_schema, read_feature_class,
    read_feature_class_with_schema,
};
pub use workspace::{FEATURE_CLASS_EXTENSION, TempWorkspace, Workspace, merge_feature_classes};
pub use writer::{
    DEFAULT_GEOMETRY_COLUMN, FeatureClassWriterOptions, write_feature_class, write_features,
    write_features_to_bytes,
};
