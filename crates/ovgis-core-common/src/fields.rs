//! Field types and cell values for persisted feature tables.
//!
//! The set mirrors what desktop GIS feature classes offer for attribute fields rather
//! than the full Arrow type system.

use std::fmt;

use arrow_schema::DataType;

/// Attribute field type of a persisted table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 16-bit integer. Used for boolean-like 0/1 flags.
    Short,
    /// 64-bit integer.
    Long,
    /// 64-bit float.
    Double,
    /// Variable length text.
    Text,
}

impl FieldType {
    /// Arrow data type used to hold this field in memory.
    #[must_use]
    pub fn to_data_type(&self) -> DataType {
        match self {
            FieldType::Short => DataType::Int16,
            FieldType::Long => DataType::Int64,
            FieldType::Double => DataType::Float64,
            FieldType::Text => DataType::Utf8,
        }
    }

    /// Closest field type for an Arrow data type.
    #[must_use]
    pub fn from_data_type(data_type: &DataType) -> Self {
        match data_type {
            DataType::Boolean | DataType::Int8 | DataType::Int16 | DataType::UInt8 => {
                FieldType::Short
            },
            DataType::Int32
            | DataType::Int64
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => FieldType::Long,
            DataType::Float16 | DataType::Float32 | DataType::Float64 => FieldType::Double,
            _ => FieldType::Text,
        }
    }

    /// Returns the string representation of this field type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Short => "SHORT",
            FieldType::Long => "LONG",
            FieldType::Double => "DOUBLE",
            FieldType::Text => "TEXT",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single value written to a persisted table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Missing value.
    Null,
    /// Value for a [`FieldType::Short`] field.
    Short(i16),
    /// Value for a [`FieldType::Long`] field.
    Long(i64),
    /// Value for a [`FieldType::Double`] field.
    Double(f64),
    /// Value for a [`FieldType::Text`] field.
    Text(String),
}

impl FieldValue {
    /// Field type this value belongs to, or `None` for [`FieldValue::Null`].
    #[must_use]
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            FieldValue::Null => None,
            FieldValue::Short(_) => Some(FieldType::Short),
            FieldValue::Long(_) => Some(FieldType::Long),
            FieldValue::Double(_) => Some(FieldType::Double),
            FieldValue::Text(_) => Some(FieldType::Text),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Short(i16::from(value))
    }
}
