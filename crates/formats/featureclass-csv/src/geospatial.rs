//! Geometry encoding for CSV feature classes
//!
//! Feature classes store their geometry column as Well-Known Text (WKT). Overture
//! delivers geometries as Well-Known Binary (WKB), so batches are re-encoded before they
//! are written. Every other column must already be flat.

use std::sync::Arc;

use arrow_array::builder::StringBuilder;
use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use geozero::ToWkt;
use geozero::wkb::Wkb;

use crate::error::{FeatureClassError, Result};

/// Returns `true` if the data type can be written to a CSV cell as is.
#[must_use]
pub fn is_flat_type(data_type: &DataType) -> bool {
    !matches!(
        data_type,
        DataType::Struct(_)
            | DataType::List(_)
            | DataType::LargeList(_)
            | DataType::FixedSizeList(_, _)
            | DataType::ListView(_)
            | DataType::LargeListView(_)
            | DataType::Map(_, _)
            | DataType::Union(_, _)
    )
}

/// Encode a WKB geometry column as WKT strings
///
/// Binary columns are decoded as WKB. Text columns are assumed to hold WKT already and
/// are returned unchanged. Null geometries stay null.
///
/// # Errors
///
/// Returns an error if a value is not valid WKB or the column type is not a geometry
/// encoding this crate understands.
pub fn encode_geometry_column(column_name: &str, array: &ArrayRef) -> Result<ArrayRef> {
    match array.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Null => Ok(Arc::clone(array)),
        DataType::Binary => {
            let binary = array.as_binary::<i32>();
            wkb_to_wkt(column_name, binary.len(), |i| {
                binary.is_valid(i).then(|| binary.value(i))
            })
        },
        DataType::LargeBinary => {
            let binary = array.as_binary::<i64>();
            wkb_to_wkt(column_name, binary.len(), |i| {
                binary.is_valid(i).then(|| binary.value(i))
            })
        },
        DataType::BinaryView => {
            let binary = array.as_binary_view();
            wkb_to_wkt(column_name, binary.len(), |i| {
                binary.is_valid(i).then(|| binary.value(i))
            })
        },
        other => Err(FeatureClassError::UnsupportedColumn {
            column: column_name.to_string(),
            data_type: other.to_string(),
        }),
    }
}

fn wkb_to_wkt<'a>(
    column_name: &str,
    len: usize,
    value_at: impl Fn(usize) -> Option<&'a [u8]>,
) -> Result<ArrayRef> {
    let mut builder = StringBuilder::with_capacity(len, len * 32);

    for row in 0..len {
        match value_at(row) {
            Some(bytes) => {
                let wkt = Wkb(bytes.to_vec())
                    .to_wkt()
                    .map_err(|err| FeatureClassError::Geometry {
                        column: column_name.to_string(),
                        row,
                        message: err.to_string(),
                    })?;
                builder.append_value(wkt);
            },
            None => builder.append_null(),
        }
    }

    Ok(Arc::new(builder.finish()))
}

/// Prepare a batch for CSV output
///
/// Re-encodes the geometry column (if present) as WKT and checks that every remaining
/// column is flat. Field metadata (such as `GeoArrow` extension tags) is dropped.
///
/// # Errors
///
/// Returns an error if the geometry cannot be encoded or a nested column remains.
pub fn prepare_batch(batch: &RecordBatch, geometry_column: &str) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns = Vec::with_capacity(batch.num_columns());

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if field.name() == geometry_column {
            let encoded = encode_geometry_column(field.name(), column)?;
            fields.push(Field::new(field.name(), DataType::Utf8, true));
            columns.push(encoded);
        } else if is_flat_type(field.data_type()) {
            fields.push(Field::new(field.name(), field.data_type().clone(), true));
            columns.push(Arc::clone(column));
        } else {
            return Err(FeatureClassError::UnsupportedColumn {
                column: field.name().clone(),
                data_type: field.data_type().to_string(),
            });
        }
    }

    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, columns)?)
}
