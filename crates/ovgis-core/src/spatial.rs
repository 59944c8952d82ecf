//! Geometry-aware in-memory tables.
//!
//! A [`SpatialTable`] is a set of record batches sharing one schema, with one column
//! holding GeoArrow geometries. Overture batches arrive with nested attribute columns and
//! WKB geometries; [`table_to_spatial_table`] flattens the former and decodes the latter.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_schema::{DataType, Field, FieldRef, Schema, SchemaRef};
use geoarrow_array::GeoArrowArray;
use geoarrow_array::array::WkbArray;
use geoarrow_array::cast::from_wkb;
use geoarrow_schema::{CoordType, GeoArrowType, GeometryType, WkbType};
use log::debug;
use serde_json::{Value, json};

use crate::error::{Result, SpatialError};
use crate::flatten::convert_complex_columns_to_strings;
use crate::types::TableInfo;

/// Coordinate reference system of all Overture data.
pub const DEFAULT_CRS: &str = "EPSG:4326";

/// Geometry column name used by Overture releases.
pub const DEFAULT_GEOMETRY_COLUMN: &str = "geometry";

const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";
const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";
const GEOARROW_PREFIX: &str = "geoarrow.";
const GEOARROW_WKB: &str = "geoarrow.wkb";

/// Options for building spatial tables.
#[derive(Debug, Clone)]
pub struct SpatialTableOptions {
    /// Column to use when no field carries a GeoArrow extension
    pub geometry_column_name: String,
    /// CRS recorded on the geometry column
    pub crs: String,
}

impl Default for SpatialTableOptions {
    fn default() -> Self {
        Self {
            geometry_column_name: DEFAULT_GEOMETRY_COLUMN.to_string(),
            crs: DEFAULT_CRS.to_string(),
        }
    }
}

impl SpatialTableOptions {
    /// Set the fallback geometry column name
    #[must_use]
    pub fn with_geometry_column(mut self, name: impl Into<String>) -> Self {
        self.geometry_column_name = name.into();
        self
    }

    /// Set the CRS recorded on the geometry column
    #[must_use]
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = crs.into();
        self
    }
}

/// Batches with a designated geometry column.
#[derive(Debug, Clone)]
pub struct SpatialTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    geometry_column: String,
}

impl SpatialTable {
    /// A table with no rows.
    #[must_use]
    pub fn empty(schema: SchemaRef, geometry_column: impl Into<String>) -> Self {
        Self {
            schema,
            batches: Vec::new(),
            geometry_column: geometry_column.into(),
        }
    }

    /// Append the rows of another spatial table.
    ///
    /// A table without batches takes over the schema of the first table appended to it.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::SchemaMismatch`] if the schemas differ.
    pub fn append(&mut self, other: SpatialTable) -> Result<()> {
        if self.batches.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.schema.fields() != other.schema.fields() {
            return Err(SpatialError::SchemaMismatch.into());
        }
        self.batches.extend(other.batches);
        Ok(())
    }

    /// Schema of every batch.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Name of the geometry column.
    #[must_use]
    pub fn geometry_column(&self) -> &str {
        &self.geometry_column
    }

    /// The batches, in arrival order.
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Returns `true` if the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Concatenate every batch into one.
    ///
    /// # Errors
    ///
    /// Returns an error if the batches cannot be concatenated.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        Ok(concat_batches(&self.schema, &self.batches)?)
    }

    /// Describe the table for display.
    #[must_use]
    pub fn info(&self, source: &str) -> TableInfo {
        TableInfo::from_schema(
            source,
            &self.schema,
            self.num_rows(),
            Some(&self.geometry_column),
        )
    }
}

/// GeoArrow extension name of a field, if any.
#[must_use]
pub fn extension_name(field: &Field) -> Option<&str> {
    field
        .metadata()
        .get(EXTENSION_NAME_KEY)
        .map(String::as_str)
        .filter(|name| name.starts_with(GEOARROW_PREFIX))
}

/// CRS recorded in a field's GeoArrow extension metadata.
#[must_use]
pub fn extension_crs(field: &Field) -> Option<String> {
    let metadata = field.metadata().get(EXTENSION_METADATA_KEY)?;
    let value: Value = serde_json::from_str(metadata).ok()?;
    match value.get("crs")? {
        Value::Null => None,
        Value::String(crs) => Some(crs.clone()),
        Value::Object(projjson) => {
            let id = projjson.get("id")?;
            let code = match id.get("code")? {
                Value::String(code) => code.clone(),
                code => code.to_string(),
            };
            Some(format!("{}:{code}", id.get("authority")?.as_str()?))
        },
        other => Some(other.to_string()),
    }
}

fn is_wkb_field(field: &Field) -> bool {
    matches!(
        field.data_type(),
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView
    )
}

/// Identify the geometry column of a schema.
///
/// A field with a GeoArrow extension wins. Otherwise a binary field named
/// `preferred` is taken to hold WKB.
///
/// # Errors
///
/// Returns [`SpatialError::MissingGeometryColumn`] if neither is found.
pub fn get_geometry_column(schema: &Schema, preferred: &str) -> Result<String> {
    if let Some(field) = schema
        .fields()
        .iter()
        .find(|f| extension_name(f).is_some())
    {
        return Ok(field.name().clone());
    }

    match schema.field_with_name(preferred) {
        Ok(field) if is_wkb_field(field) => Ok(field.name().clone()),
        _ => Err(SpatialError::MissingGeometryColumn {
            available: schema
                .fields()
                .iter()
                .map(|f| f.name().as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
        .into()),
    }
}

fn geometry_field(name: &str, crs: &str) -> Field {
    let field = GeometryType::new(Arc::default())
        .with_coord_type(CoordType::Interleaved)
        .to_field(name, true);

    let mut metadata: HashMap<String, String> = field.metadata().clone();
    metadata.insert(
        EXTENSION_METADATA_KEY.to_string(),
        json!({"crs": crs, "crs_type": "authority_code"}).to_string(),
    );
    field.with_metadata(metadata)
}

fn decode_wkb(name: &str, column: &ArrayRef, crs: &str) -> Result<(FieldRef, ArrayRef)> {
    let decode_error = |message: String| SpatialError::GeometryDecode {
        column: name.to_string(),
        message,
    };

    let binary = match column.data_type() {
        DataType::Binary => Arc::clone(column),
        _ => arrow_cast::cast(column.as_ref(), &DataType::Binary)?,
    };
    let wkb = WkbArray::from((binary.as_binary::<i32>().clone(), WkbType::new(Arc::default())));

    let field = geometry_field(name, crs);
    let target = GeoArrowType::Geometry(
        GeometryType::new(Arc::default()).with_coord_type(CoordType::Interleaved),
    );
    let geometries = from_wkb(&wkb, target).map_err(|err| decode_error(err.to_string()))?;

    Ok((Arc::new(field), geometries.into_array_ref()))
}

/// Build a spatial table from one Overture batch.
///
/// Nested columns are flattened to JSON text. A WKB geometry column is decoded into a
/// GeoArrow geometry column tagged with the configured CRS. A column that already
/// carries a GeoArrow extension other than WKB is kept as is.
///
/// # Errors
///
/// Returns an error if no geometry column is found or its values cannot be decoded.
pub fn table_to_spatial_table(
    batch: &RecordBatch,
    options: &SpatialTableOptions,
) -> Result<SpatialTable> {
    let flat = convert_complex_columns_to_strings(batch)?;
    let schema = flat.schema();
    let geometry_column = get_geometry_column(&schema, &options.geometry_column_name)?;
    let (index, field) = schema
        .column_with_name(&geometry_column)
        .ok_or_else(|| SpatialError::MissingGeometryColumn {
            available: geometry_column.clone(),
        })?;

    let encoded_as_wkb = match extension_name(field) {
        Some(name) => name == GEOARROW_WKB,
        None => true,
    };
    if !encoded_as_wkb || !is_wkb_field(field) {
        return Ok(SpatialTable {
            schema: Arc::clone(&schema),
            batches: vec![flat],
            geometry_column,
        });
    }

    debug!(
        "Decoding {} WKB geometries in column '{geometry_column}'",
        flat.num_rows()
    );
    let (new_field, new_column) = decode_wkb(&geometry_column, flat.column(index), &options.crs)?;

    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns = flat.columns().to_vec();
    fields[index] = new_field;
    columns[index] = new_column;

    let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
    let batch = RecordBatch::try_new(Arc::clone(&schema), columns)?;

    Ok(SpatialTable {
        schema,
        batches: vec![batch],
        geometry_column,
    })
}
