//! Cell values of nested Arrow columns.
//!
//! [`ColumnValue`] is the shape of one cell of a struct, list or map column. It is read
//! out of an Arrow array row by row and serialized to JSON text for flat outputs.

use arrow_array::cast::AsArray;
use arrow_array::types::{
    Float16Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type, UInt64Type,
};
use arrow_array::{Array, ArrayRef};
use arrow_cast::display::{ArrayFormatter, FormatOptions};
use arrow_schema::{ArrowError, DataType};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A scalar leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Text, including values with no JSON-native form rendered by Arrow's formatter
    String(String),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Bool(bool),
}

/// The value of a single cell.
///
/// Struct fields keep their schema order. Map entries keep their stored order and use
/// stringified keys.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// Missing value
    Null,
    /// Scalar value
    Primitive(Primitive),
    /// Named fields of a struct
    Struct(Vec<(String, ColumnValue)>),
    /// Elements of a list
    List(Vec<ColumnValue>),
    /// Entries of a map
    Map(Vec<(String, ColumnValue)>),
}

impl ColumnValue {
    /// Read the value at `row` of `array`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value has no JSON-native form and Arrow cannot format it.
    pub fn from_array(array: &dyn Array, row: usize) -> Result<Self, ArrowError> {
        if array.is_null(row) {
            return Ok(ColumnValue::Null);
        }

        let value = match array.data_type() {
            DataType::Null => ColumnValue::Null,
            DataType::Boolean => Primitive::Bool(array.as_boolean().value(row)).into(),
            DataType::Int8 => Primitive::Int(i64::from(array.as_primitive::<Int8Type>().value(row))).into(),
            DataType::Int16 => {
                Primitive::Int(i64::from(array.as_primitive::<Int16Type>().value(row))).into()
            },
            DataType::Int32 => {
                Primitive::Int(i64::from(array.as_primitive::<Int32Type>().value(row))).into()
            },
            DataType::Int64 => Primitive::Int(array.as_primitive::<Int64Type>().value(row)).into(),
            DataType::UInt8 => {
                Primitive::UInt(u64::from(array.as_primitive::<UInt8Type>().value(row))).into()
            },
            DataType::UInt16 => {
                Primitive::UInt(u64::from(array.as_primitive::<UInt16Type>().value(row))).into()
            },
            DataType::UInt32 => {
                Primitive::UInt(u64::from(array.as_primitive::<UInt32Type>().value(row))).into()
            },
            DataType::UInt64 => {
                Primitive::UInt(array.as_primitive::<UInt64Type>().value(row)).into()
            },
            DataType::Float16 => Primitive::Float(f64::from(
                array.as_primitive::<Float16Type>().value(row).to_f32(),
            ))
            .into(),
            DataType::Float32 => {
                Primitive::Float(f64::from(array.as_primitive::<Float32Type>().value(row))).into()
            },
            DataType::Float64 => {
                Primitive::Float(array.as_primitive::<Float64Type>().value(row)).into()
            },
            DataType::Utf8 => Primitive::String(array.as_string::<i32>().value(row).to_string()).into(),
            DataType::LargeUtf8 => {
                Primitive::String(array.as_string::<i64>().value(row).to_string()).into()
            },
            DataType::Utf8View => {
                Primitive::String(array.as_string_view().value(row).to_string()).into()
            },
            DataType::Struct(fields) => {
                let strukt = array.as_struct();
                let mut values = Vec::with_capacity(fields.len());
                for (field, column) in fields.iter().zip(strukt.columns()) {
                    values.push((field.name().clone(), Self::from_array(column.as_ref(), row)?));
                }
                ColumnValue::Struct(values)
            },
            DataType::List(_) => Self::from_elements(&array.as_list::<i32>().value(row))?,
            DataType::LargeList(_) => Self::from_elements(&array.as_list::<i64>().value(row))?,
            DataType::ListView(_) => {
                Self::from_elements(&array.as_list_view::<i32>().value(row))?
            },
            DataType::LargeListView(_) => {
                Self::from_elements(&array.as_list_view::<i64>().value(row))?
            },
            DataType::FixedSizeList(_, _) => {
                Self::from_elements(&array.as_fixed_size_list().value(row))?
            },
            DataType::Map(_, _) => {
                let entries = array.as_map().value(row);
                let keys = entries.column(0);
                let values = entries.column(1);
                let mut pairs = Vec::with_capacity(entries.len());
                for i in 0..entries.len() {
                    let key = Self::from_array(keys.as_ref(), i)?.into_key();
                    pairs.push((key, Self::from_array(values.as_ref(), i)?));
                }
                ColumnValue::Map(pairs)
            },
            _ => {
                let formatter = ArrayFormatter::try_new(array, &FormatOptions::default())?;
                Primitive::String(formatter.value(row).to_string()).into()
            },
        };

        Ok(value)
    }

    fn from_elements(elements: &ArrayRef) -> Result<Self, ArrowError> {
        let mut items = Vec::with_capacity(elements.len());
        for i in 0..elements.len() {
            items.push(Self::from_array(elements.as_ref(), i)?);
        }
        Ok(ColumnValue::List(items))
    }

    /// Render a value as a JSON object key.
    fn into_key(self) -> String {
        match self {
            ColumnValue::Primitive(Primitive::String(s)) => s,
            other => other.to_json().unwrap_or_default(),
        }
    }

    /// Returns `true` for [`ColumnValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Serialize to compact JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<Primitive> for ColumnValue {
    fn from(value: Primitive) -> Self {
        ColumnValue::Primitive(value)
    }
}

impl Serialize for Primitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Primitive::String(s) => serializer.serialize_str(s),
            Primitive::Int(v) => serializer.serialize_i64(*v),
            Primitive::UInt(v) => serializer.serialize_u64(*v),
            Primitive::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Primitive::Float(_) => serializer.serialize_unit(),
            Primitive::Bool(v) => serializer.serialize_bool(*v),
        }
    }
}

impl Serialize for ColumnValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ColumnValue::Null => serializer.serialize_unit(),
            ColumnValue::Primitive(value) => value.serialize(serializer),
            ColumnValue::Struct(entries) | ColumnValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            },
            ColumnValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            },
        }
    }
}
