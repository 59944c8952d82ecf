//! Bounding box validation.
//!
//! A bounding box is `(minx, miny, maxx, maxy)` in EPSG:4326 degrees. Validation only
//! checks shape and ordering; coordinates are returned exactly as given.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Reasons a bounding box is rejected.
///
/// The messages are fixed so callers can match on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundingBoxError {
    /// The input did not have exactly four elements.
    #[error("Bounding box must be a tuple of four values")]
    Length {
        /// Number of elements received
        found: usize,
    },

    /// At least one element could not be read as a finite number.
    #[error("All coordinates in the bounding box must be numeric")]
    NonNumeric {
        /// Zero-based position of the first offending element
        index: usize,
    },

    /// `minx >= maxx` or `miny >= maxy`.
    #[error("Invalid bounding box coordinates")]
    Order,
}

/// A value that may be interpreted as a single coordinate.
///
/// Implemented for numeric primitives, strings (parsed as `f64`) and JSON values so the
/// validator can be fed untyped input from the command line or a config document.
pub trait CoordinateValue {
    /// Returns the coordinate as a finite `f64`, or `None` if it is not numeric.
    fn as_coordinate(&self) -> Option<f64>;
}

impl CoordinateValue for f64 {
    fn as_coordinate(&self) -> Option<f64> {
        self.is_finite().then_some(*self)
    }
}

impl CoordinateValue for f32 {
    fn as_coordinate(&self) -> Option<f64> {
        f64::from(*self).as_coordinate()
    }
}

impl CoordinateValue for i32 {
    fn as_coordinate(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl CoordinateValue for i64 {
    #[allow(clippy::cast_precision_loss)]
    fn as_coordinate(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl CoordinateValue for &str {
    fn as_coordinate(&self) -> Option<f64> {
        self.trim().parse::<f64>().ok()?.as_coordinate()
    }
}

impl CoordinateValue for String {
    fn as_coordinate(&self) -> Option<f64> {
        self.as_str().as_coordinate()
    }
}

impl CoordinateValue for serde_json::Value {
    fn as_coordinate(&self) -> Option<f64> {
        match self {
            serde_json::Value::Number(n) => n.as_f64()?.as_coordinate(),
            _ => None,
        }
    }
}

/// A validated `(minx, miny, maxx, maxy)` bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western edge.
    pub minx: f64,
    /// Southern edge.
    pub miny: f64,
    /// Eastern edge.
    pub maxx: f64,
    /// Northern edge.
    pub maxy: f64,
}

impl BoundingBox {
    /// Returns the box as a `(minx, miny, maxx, maxy)` tuple.
    #[must_use]
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.minx, self.miny, self.maxx, self.maxy)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.minx, self.miny, self.maxx, self.maxy
        )
    }
}

impl FromStr for BoundingBox {
    type Err = BoundingBoxError;

    /// Parses `"minx,miny,maxx,maxy"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        validate_bounding_box(&parts)
    }
}

/// Validates a candidate bounding box.
///
/// Checks are applied in order: element count, numeric type, then coordinate order.
///
/// # Errors
///
/// Returns the first [`BoundingBoxError`] encountered.
///
/// # Examples
///
/// ```
/// use ovgis_core_common::bbox::{BoundingBoxError, validate_bounding_box};
///
/// let bbox = validate_bounding_box(&[-122.9049, 47.0384, -122.8909, 47.0473]).unwrap();
/// assert_eq!(bbox.as_tuple(), (-122.9049, 47.0384, -122.8909, 47.0473));
///
/// let err = validate_bounding_box(&[1.0, 2.0, 3.0]).unwrap_err();
/// assert_eq!(err, BoundingBoxError::Length { found: 3 });
/// ```
pub fn validate_bounding_box<T: CoordinateValue>(
    values: &[T],
) -> Result<BoundingBox, BoundingBoxError> {
    let [minx, miny, maxx, maxy] = values else {
        return Err(BoundingBoxError::Length {
            found: values.len(),
        });
    };

    let mut coords = [0.0_f64; 4];
    for (index, (slot, value)) in coords
        .iter_mut()
        .zip([minx, miny, maxx, maxy])
        .enumerate()
    {
        *slot = value
            .as_coordinate()
            .ok_or(BoundingBoxError::NonNumeric { index })?;
    }

    let [minx, miny, maxx, maxy] = coords;
    if minx >= maxx || miny >= maxy {
        return Err(BoundingBoxError::Order);
    }

    Ok(BoundingBox {
        minx,
        miny,
        maxx,
        maxy,
    })
}
