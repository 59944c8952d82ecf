//! Registry of Overture Maps feature types and the themes they are published under.
//!
//! Overture partitions every release by `theme=<theme>/type=<type>`, so a feature type
//! alone is enough to locate its data once the theme is known. The registry is static and
//! mirrors the published schema; it is the single source of truth for validating the
//! feature type a caller asks for.
//!
//! # Examples
//!
//! ```
//! use ovgis_core_common::overture::{find_overture_type, get_all_overture_types};
//!
//! let segment = find_overture_type("segment").expect("segment should exist");
//! assert_eq!(segment.theme.as_str(), "transportation");
//!
//! assert!(get_all_overture_types().contains(&"building"));
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// Top-level Overture theme a feature type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Theme {
    /// Address points.
    Addresses,
    /// Land, water, land use and infrastructure base layers.
    Base,
    /// Building footprints and parts.
    Buildings,
    /// Administrative divisions.
    Divisions,
    /// Points of interest.
    Places,
    /// Road, rail and path network.
    Transportation,
}

impl Theme {
    /// Returns the theme name as used in the release partition path.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Addresses => "addresses",
            Theme::Base => "base",
            Theme::Buildings => "buildings",
            Theme::Divisions => "divisions",
            Theme::Places => "places",
            Theme::Transportation => "transportation",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry family a feature type is published with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// Point features.
    Point,
    /// Line features (polylines in most desktop GIS tools).
    LineString,
    /// Polygon and multipolygon features.
    Polygon,
    /// The type mixes several geometry families.
    Mixed,
}

impl GeometryKind {
    /// Returns the string representation of this geometry kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::Mixed => "Mixed",
        }
    }
}

/// An Overture feature type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OvertureType {
    /// Type name used in the release partition path (e.g., `"segment"`).
    pub name: &'static str,
    /// Theme the type is published under.
    pub theme: Theme,
    /// Geometry family of the features.
    pub geometry: GeometryKind,
}

impl OvertureType {
    /// Creates a new feature type definition.
    #[must_use]
    pub const fn new(name: &'static str, theme: Theme, geometry: GeometryKind) -> Self {
        Self {
            name,
            theme,
            geometry,
        }
    }

    /// Relative partition prefix of this type inside a release.
    ///
    /// ```
    /// use ovgis_core_common::overture::find_overture_type;
    ///
    /// let place = find_overture_type("place").unwrap();
    /// assert_eq!(place.partition_prefix(), "theme=places/type=place");
    /// ```
    #[must_use]
    pub fn partition_prefix(&self) -> String {
        format!("theme={}/type={}", self.theme.as_str(), self.name)
    }
}

impl fmt::Display for OvertureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

const OVERTURE_TYPES: &[OvertureType] = &[
    OvertureType::new("address", Theme::Addresses, GeometryKind::Point),
    OvertureType::new("bathymetry", Theme::Base, GeometryKind::Polygon),
    OvertureType::new("infrastructure", Theme::Base, GeometryKind::Mixed),
    OvertureType::new("land", Theme::Base, GeometryKind::Mixed),
    OvertureType::new("land_cover", Theme::Base, GeometryKind::Polygon),
    OvertureType::new("land_use", Theme::Base, GeometryKind::Mixed),
    OvertureType::new("water", Theme::Base, GeometryKind::Mixed),
    OvertureType::new("building", Theme::Buildings, GeometryKind::Polygon),
    OvertureType::new("building_part", Theme::Buildings, GeometryKind::Polygon),
    OvertureType::new("division", Theme::Divisions, GeometryKind::Point),
    OvertureType::new("division_area", Theme::Divisions, GeometryKind::Polygon),
    OvertureType::new("division_boundary", Theme::Divisions, GeometryKind::LineString),
    OvertureType::new("place", Theme::Places, GeometryKind::Point),
    OvertureType::new("connector", Theme::Transportation, GeometryKind::Point),
    OvertureType::new("segment", Theme::Transportation, GeometryKind::LineString),
];

/// Returns every registered feature type definition.
#[must_use]
pub fn overture_types() -> &'static [OvertureType] {
    OVERTURE_TYPES
}

/// Returns the names of all registered feature types, in registry order.
#[must_use]
pub fn get_all_overture_types() -> Vec<&'static str> {
    OVERTURE_TYPES.iter().map(|t| t.name).collect()
}

/// Returns a mapping of feature type name to theme name.
#[must_use]
pub fn get_type_theme_map() -> BTreeMap<&'static str, &'static str> {
    OVERTURE_TYPES
        .iter()
        .map(|t| (t.name, t.theme.as_str()))
        .collect()
}

/// Looks up a feature type by its exact name.
#[must_use]
pub fn find_overture_type(name: &str) -> Option<OvertureType> {
    OVERTURE_TYPES.iter().find(|t| t.name == name).copied()
}

/// Returns the theme name for a feature type, if it is registered.
#[must_use]
pub fn theme_for(name: &str) -> Option<&'static str> {
    find_overture_type(name).map(|t| t.theme.as_str())
}
