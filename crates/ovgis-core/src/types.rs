//! Descriptions of fetched tables and feature classes.
//!
//! These are plain data structures consumed by the CLI to print a schema summary.

use arrow_schema::Schema;

use crate::spatial::{extension_crs, extension_name};
use crate::utils::ArrowDataTypeExt;

/// Summary of a spatial table or feature class.
#[derive(Debug, Clone)]
pub struct TableInfo {
    /// Where the data came from (Overture type or feature class path)
    pub source: String,
    /// Number of rows
    pub row_count: usize,
    /// Geometry columns information
    pub geometry_columns: Vec<GeometryColumnInfo>,
    /// Attribute fields
    pub fields: Vec<FieldInfo>,
}

/// Information about a geometry column.
#[derive(Debug, Clone)]
pub struct GeometryColumnInfo {
    /// Column name
    pub name: String,
    /// Data type description
    pub data_type: String,
    /// Extension name (e.g., "geoarrow.geometry")
    pub extension: Option<String>,
    /// CRS information
    pub crs: Option<String>,
}

/// Information about a field/column.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Data type
    pub data_type: String,
    /// Whether the field is nullable
    pub nullable: bool,
}

impl TableInfo {
    /// Describe a schema.
    ///
    /// Fields carrying a GeoArrow extension, and the named `geometry_column` if any, are
    /// listed as geometry columns. All other fields are attributes.
    #[must_use]
    pub fn from_schema(
        source: impl Into<String>,
        schema: &Schema,
        row_count: usize,
        geometry_column: Option<&str>,
    ) -> Self {
        let mut geometry_columns = Vec::new();
        let mut fields = Vec::new();

        for field in schema.fields() {
            let extension = extension_name(field).map(str::to_string);
            if extension.is_some() || geometry_column == Some(field.name().as_str()) {
                geometry_columns.push(GeometryColumnInfo {
                    name: field.name().clone(),
                    data_type: field.data_type().format(),
                    extension,
                    crs: extension_crs(field),
                });
            } else {
                fields.push(FieldInfo {
                    name: field.name().clone(),
                    data_type: field.data_type().format(),
                    nullable: field.is_nullable(),
                });
            }
        }

        Self {
            source: source.into(),
            row_count,
            geometry_columns,
            fields,
        }
    }
}
