//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting fetched tables and the Overture type registry.

use tabled::{Table, Tabled};

use ovgis_core::materialize::MaterializeSummary;
use ovgis_core::types::TableInfo;
use ovgis_core::utils::display_or_na;
use ovgis_core_common::OvertureType;

/// Table row representation for displaying geometry column information.
#[derive(Tabled)]
pub struct GeometryRow {
    /// Name of the geometry column.
    #[tabled(rename = "Column")]
    pub name: String,
    /// `GeoArrow` extension name for the geometry type.
    #[tabled(rename = "Extension")]
    pub extension: String,
    /// Coordinate Reference System information.
    #[tabled(rename = "CRS")]
    pub crs: String,
}

/// Table row representation for displaying field/column information.
#[derive(Tabled)]
pub struct FieldRow {
    /// Name of the field.
    #[tabled(rename = "Field")]
    pub name: String,
    /// Data type of the field.
    #[tabled(rename = "Type")]
    pub data_type: String,
    /// Whether the field can contain null values.
    #[tabled(rename = "Nullable")]
    pub nullable: String,
}

/// Table row representation for one Overture feature type.
#[derive(Tabled)]
pub struct TypeRow {
    /// Type name (e.g., `segment`).
    #[tabled(rename = "Type")]
    pub name: String,
    /// Theme the type is published under.
    #[tabled(rename = "Theme")]
    pub theme: String,
    /// Geometry family.
    #[tabled(rename = "Geometry")]
    pub geometry: String,
}

impl From<&OvertureType> for TypeRow {
    fn from(t: &OvertureType) -> Self {
        Self {
            name: t.name.to_string(),
            theme: t.theme.as_str().to_string(),
            geometry: t.geometry.as_str().to_string(),
        }
    }
}

/// Render table information as text.
#[must_use]
pub fn render_table_info(info: &TableInfo) -> String {
    let mut out = format!("\nSource: {}\nFeatures: {}\n", info.source, info.row_count);

    if !info.geometry_columns.is_empty() {
        out.push_str("\n=== Geometry Columns ===\n");
        let geo_rows: Vec<GeometryRow> = info
            .geometry_columns
            .iter()
            .map(|g| GeometryRow {
                name: g.name.clone(),
                extension: display_or_na(g.extension.as_deref()),
                crs: display_or_na(g.crs.as_deref()),
            })
            .collect();
        out.push_str(&Table::new(geo_rows).to_string());
        out.push('\n');
    }

    if !info.fields.is_empty() {
        out.push_str("\n=== Fields ===\n");
        let field_rows: Vec<FieldRow> = info
            .fields
            .iter()
            .map(|f| FieldRow {
                name: f.name.clone(),
                data_type: f.data_type.clone(),
                nullable: if f.nullable { "Yes" } else { "No" }.to_string(),
            })
            .collect();
        out.push_str(&Table::new(field_rows).to_string());
        out.push('\n');
    }

    out
}

/// Display table information in a formatted table.
pub fn display_table_info(info: &TableInfo) {
    print!("{}", render_table_info(info));
}

/// Display the Overture type registry.
pub fn display_types(types: &[OvertureType]) {
    println!("\nOverture Types ({} total):\n", types.len());
    let rows: Vec<TypeRow> = types.iter().map(TypeRow::from).collect();
    println!("{}", Table::new(rows));
}

/// Display the outcome of adding access restriction fields.
pub fn display_summary(summary: &MaterializeSummary) {
    if summary.keys.is_empty() {
        println!("No access restrictions found.");
        return;
    }
    println!(
        "Wrote {} access restriction field(s) ({} new) to {} row(s):",
        summary.keys.len(),
        summary.fields_added.len(),
        summary.rows_written
    );
    for key in &summary.keys {
        println!("  - {key}");
    }
}
