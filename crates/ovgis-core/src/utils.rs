//! Utility functions and extension traits for Overture conversions.

use arrow_schema::DataType;

/// Extension trait for formatting Arrow [`DataType`] into human-readable strings.
///
/// # Examples
///
/// ```
/// use arrow_schema::DataType;
/// use ovgis_core::utils::ArrowDataTypeExt;
///
/// assert_eq!(DataType::Int16.format(), "Short");
/// assert_eq!(DataType::Utf8.format(), "Text");
/// ```
pub trait ArrowDataTypeExt {
    /// Format the data type as a label a GIS user recognizes.
    fn format(&self) -> String;
}

impl ArrowDataTypeExt for DataType {
    fn format(&self) -> String {
        match self {
            DataType::Boolean => "Boolean".to_string(),
            DataType::Int8 | DataType::Int16 | DataType::UInt8 => "Short".to_string(),
            DataType::Int32
            | DataType::Int64
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => "Long".to_string(),
            DataType::Float16 | DataType::Float32 => "Float".to_string(),
            DataType::Float64 => "Double".to_string(),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "Text".to_string(),
            DataType::Binary | DataType::LargeBinary | DataType::BinaryView => {
                "Blob".to_string()
            },
            DataType::Date32 | DataType::Date64 => "Date".to_string(),
            DataType::Timestamp(unit, tz) => {
                let tz_str = tz.as_ref().map_or("", |t| t.as_ref());
                format!("Timestamp({unit:?}, {tz_str})")
            },
            DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(_, _) => {
                "List".to_string()
            },
            DataType::Struct(_) => "Struct".to_string(),
            DataType::Map(_, _) => "Map".to_string(),
            _ => format!("{self:?}"),
        }
    }
}

/// Render an optional text cell for display.
#[must_use]
pub fn display_or_na(value: Option<&str>) -> String {
    value.map_or_else(|| "N/A".to_string(), str::to_string)
}
