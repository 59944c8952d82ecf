//! Common types and traits shared across `ovgis` crates.
//!
//! This crate provides the abstractions shared between `ovgis-core` and the feature
//! class format crate: the Overture type registry, bounding boxes, the batch source and
//! feature table seams, and an in-memory feature table.

pub mod bbox;
pub mod fields;
pub mod io;
pub mod overture;
pub mod table;

// Re-export commonly used types
pub use bbox::{BoundingBox, BoundingBoxError, CoordinateValue, validate_bounding_box};
pub use fields::{FieldType, FieldValue};
pub use io::{BatchRequest, BatchSource, FeatureTable};
pub use overture::{GeometryKind, OvertureType, Theme};
pub use table::MemoryTable;
