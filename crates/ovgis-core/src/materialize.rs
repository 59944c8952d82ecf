//! Boolean access restriction fields.
//!
//! Adds one 0/1 field per access restriction key found anywhere in a feature table. The
//! rules of each row are read from a JSON text column, flattened with
//! [`flatten_dict_to_bool_keys`](crate::access::flatten_dict_to_bool_keys), and the union
//! of every row's keys becomes the set of fields.
//!
//! Keys are turned into field names with [`field_name`], which replaces every character
//! outside `[A-Za-z0-9_]` with `_`. Keys taken from free text such as opening hours would
//! otherwise not be valid GIS field names.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use ovgis_core_common::{FeatureTable, FieldType, FieldValue};
use serde_json::Value;

use crate::access::rule_keys;
use crate::error::{AccessRuleError, Result};

/// Column holding the serialized access restriction rules of a segment.
pub const ACCESS_RESTRICTIONS_COLUMN: &str = "access_restrictions";

/// Outcome of a materialization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeSummary {
    /// Every key observed across all rows, sorted
    pub keys: Vec<String>,
    /// Fields that did not exist before this run
    pub fields_added: Vec<String>,
    /// Number of rows whose flags were written
    pub rows_written: usize,
}

/// Decode one row of serialized rules into a rule list.
///
/// Null rows, undecodable text and values that are neither a rule nor a list of rules are
/// treated as a row without rules.
#[must_use]
pub fn decode_rules(text: Option<&str>) -> Vec<Value> {
    let Some(text) = text else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(rules)) => rules,
        Ok(rule @ Value::Object(_)) => vec![rule],
        Ok(Value::Null) => Vec::new(),
        Ok(other) => {
            warn!("Ignoring access restrictions that are not a list of rules: {other}");
            Vec::new()
        },
        Err(err) => {
            warn!("Ignoring undecodable access restrictions: {err}");
            Vec::new()
        },
    }
}

/// Field name for an access restriction key.
///
/// ```
/// use ovgis_core::materialize::field_name;
///
/// assert_eq!(
///     field_name("access_denied_when_during_Mo-Fr 07:00-09:00"),
///     "access_denied_when_during_Mo_Fr_07_00_09_00"
/// );
/// ```
#[must_use]
pub fn field_name(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Field names of every row, one set per row.
///
/// # Errors
///
/// Returns [`AccessRuleError::NotARule`] if a rule list holds a scalar.
pub fn row_key_sets(rows: &[Option<String>]) -> std::result::Result<Vec<BTreeSet<String>>, AccessRuleError> {
    rows.iter()
        .map(|row| {
            let mut keys = BTreeSet::new();
            for rule in decode_rules(row.as_deref()) {
                keys.extend(rule_keys(&rule)?.iter().map(|key| field_name(key)));
            }
            Ok(keys)
        })
        .collect()
}

/// Union of all row key sets.
#[must_use]
pub fn boolean_field_set(rows: &[BTreeSet<String>]) -> BTreeSet<String> {
    rows.iter().flatten().cloned().collect()
}

/// Add and populate one boolean field per access restriction key.
///
/// Missing fields are added as [`FieldType::Short`]. Every row then receives `1` or `0` in
/// every field of the current key set, so running this again on changed data refreshes
/// those fields. Fields whose key no longer occurs are left as they are.
///
/// The table is edited in place and is not rolled back on failure.
///
/// # Errors
///
/// Returns an error if the column cannot be read, a rule is malformed, or the table
/// rejects a schema change or write.
pub fn add_boolean_access_restrictions_fields(
    table: &mut dyn FeatureTable,
    column: &str,
) -> Result<MaterializeSummary> {
    let rows = table.read_text(column)?;
    let row_keys = row_key_sets(&rows)?;
    let keys = boolean_field_set(&row_keys);

    if keys.is_empty() {
        info!("No access restrictions found in '{column}'");
        return Ok(MaterializeSummary::default());
    }

    let mut fields_added = Vec::new();
    for key in &keys {
        if table.has_field(key) {
            debug!("Field '{key}' already exists");
            continue;
        }
        table.add_field(key, FieldType::Short)?;
        fields_added.push(key.clone());
    }

    for (row, present) in row_keys.iter().enumerate() {
        for key in &keys {
            table.write_value(row, key, FieldValue::from(present.contains(key)))?;
        }
    }

    info!(
        "Materialized {} access restriction field(s) ({} new) over {} row(s)",
        keys.len(),
        fields_added.len(),
        row_keys.len()
    );

    Ok(MaterializeSummary {
        keys: keys.into_iter().collect(),
        fields_added,
        rows_written: row_keys.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow_array::{RecordBatch, StringArray};
    use arrow_schema::{DataType, Field, Schema};
    use ovgis_core_common::MemoryTable;

    fn segments(rules: Vec<Option<&str>>) -> MemoryTable {
        let ids: Vec<String> = (0..rules.len()).map(|i| format!("s{i}")).collect();
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(ACCESS_RESTRICTIONS_COLUMN, DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(rules)),
            ],
        )
        .unwrap();
        MemoryTable::new(&batch)
    }

    fn flags(table: &MemoryTable, field: &str) -> Vec<Option<String>> {
        table.read_text(field).unwrap()
    }

    fn text(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some((*v).to_string())).collect()
    }

    #[test]
    fn test_decode_rules_shapes() {
        assert_eq!(decode_rules(None), Vec::<Value>::new());
        assert!(decode_rules(Some("null")).is_empty());
        assert!(decode_rules(Some("not json")).is_empty());
        assert!(decode_rules(Some("42")).is_empty());
        assert_eq!(decode_rules(Some(r#"{"access_type":"denied"}"#)).len(), 1);
        assert_eq!(decode_rules(Some(r#"[{"access_type":"denied"}, null]"#)).len(), 2);
    }

    #[test]
    fn test_boolean_field_set_is_union() {
        let rows = vec![
            Some(r#"[{"access_type":"denied","when":{"heading":"backward"}}]"#.to_string()),
            None,
            Some(r#"[{"access_type":"denied","when":{"mode":["bicycle"]}}]"#.to_string()),
        ];
        let keys = boolean_field_set(&row_key_sets(&rows).unwrap());
        assert_eq!(
            keys.into_iter().collect::<Vec<_>>(),
            vec![
                "access_denied_when_heading_backward",
                "access_denied_when_mode_bicycle"
            ]
        );
    }

    #[test]
    fn test_adds_fields_and_writes_flags() {
        let mut table = segments(vec![
            Some(r#"[{"access_type":"denied","when":{"heading":"backward"}}]"#),
            Some("null"),
            Some(r#"[{"access_type":"denied"},{"access_type":"denied","when":{"mode":["bicycle"]}}]"#),
            None,
        ]);

        let summary = add_boolean_access_restrictions_fields(&mut table, ACCESS_RESTRICTIONS_COLUMN)
            .unwrap();

        assert_eq!(summary.rows_written, 4);
        assert_eq!(summary.fields_added, summary.keys);
        assert_eq!(
            table.field_names(),
            vec![
                "id",
                ACCESS_RESTRICTIONS_COLUMN,
                "access_denied",
                "access_denied_when_heading_backward",
                "access_denied_when_mode_bicycle",
            ]
        );
        assert_eq!(table.field_type("access_denied"), Some(FieldType::Short));
        assert_eq!(flags(&table, "access_denied"), text(&["0", "0", "1", "0"]));
        assert_eq!(
            flags(&table, "access_denied_when_heading_backward"),
            text(&["1", "0", "0", "0"])
        );
        assert_eq!(
            flags(&table, "access_denied_when_mode_bicycle"),
            text(&["0", "0", "1", "0"])
        );
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mut table = segments(vec![
            Some(r#"[{"access_type":"allowed","when":{"using":["as_customer"]}}]"#),
            None,
        ]);

        add_boolean_access_restrictions_fields(&mut table, ACCESS_RESTRICTIONS_COLUMN).unwrap();
        let first = table.to_record_batch().unwrap();

        let summary = add_boolean_access_restrictions_fields(&mut table, ACCESS_RESTRICTIONS_COLUMN)
            .unwrap();
        assert!(summary.fields_added.is_empty());
        assert_eq!(summary.keys, vec!["access_allowed_when_using_as_customer"]);
        assert_eq!(table.to_record_batch().unwrap(), first);
    }

    #[test]
    fn test_no_rules_leaves_table_unchanged() {
        let mut table = segments(vec![None, Some("null"), Some("[]")]);
        let summary = add_boolean_access_restrictions_fields(&mut table, ACCESS_RESTRICTIONS_COLUMN)
            .unwrap();
        assert_eq!(summary, MaterializeSummary::default());
        assert_eq!(table.field_names(), vec!["id", ACCESS_RESTRICTIONS_COLUMN]);
    }

    #[test]
    fn test_field_names_are_normalized() {
        let mut table = segments(vec![
            Some(r#"[{"access_type":"denied","when":{"during":"Mo-Fr 07:00-09:00"}}]"#),
            Some(r#"[{"access_type":"allowed","when":{"vehicle":[{"value":3.5}]}}]"#),
        ]);

        let summary = add_boolean_access_restrictions_fields(&mut table, ACCESS_RESTRICTIONS_COLUMN)
            .unwrap();

        assert_eq!(
            summary.keys,
            vec![
                "access_allowed_when_vehicle_value_3_5",
                "access_denied_when_during_Mo_Fr_07_00_09_00",
            ]
        );
        for name in &summary.keys {
            assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
        assert_eq!(
            flags(&table, "access_denied_when_during_Mo_Fr_07_00_09_00"),
            text(&["1", "0"])
        );
        assert_eq!(
            flags(&table, "access_allowed_when_vehicle_value_3_5"),
            text(&["0", "1"])
        );
    }

    #[test]
    fn test_missing_column_fails() {
        let mut table = segments(vec![None]);
        assert!(add_boolean_access_restrictions_fields(&mut table, "restrictions").is_err());
    }

    #[test]
    fn test_scalar_rule_aborts() {
        let mut table = segments(vec![Some(r#"["denied"]"#)]);
        let err = add_boolean_access_restrictions_fields(&mut table, ACCESS_RESTRICTIONS_COLUMN)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::OvertureError::AccessRule(AccessRuleError::NotARule { .. })
        ));
        assert_eq!(table.field_names().len(), 2);
    }
}
