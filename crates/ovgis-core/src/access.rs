//! Access restriction rules to boolean keys.
//!
//! Each Overture access restriction rule is a small JSON document such as
//! `{"access_type": "denied", "when": {"heading": "backward"}}`. A rule is turned into
//! flat key names, one per leaf value, so every distinct restriction can become its own
//! boolean column:
//!
//! ```text
//! access_denied_when_heading_backward
//! ```
//!
//! The top-level `access_type` becomes the `access_<value>` prefix of every key of its
//! rule. Null values and empty containers produce no keys.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::error::AccessRuleError;

/// Rule entry used as the key prefix.
pub const ACCESS_TYPE_KEY: &str = "access_type";

const SEPARATOR: &str = "_";

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Synthesize keys for `value` found at `path`.
///
/// Scalars yield `path_value`. Lists yield the keys of each element at the same path.
/// Objects extend the path with each entry name.
///
/// ```
/// use ovgis_core::access::synthesize_keys;
/// use serde_json::json;
///
/// let keys = synthesize_keys(&json!({"mode": ["bicycle", "foot"]}), &["when"]);
/// assert_eq!(keys, vec!["when_mode_bicycle", "when_mode_foot"]);
/// ```
#[must_use]
pub fn synthesize_keys(value: &Value, path: &[&str]) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .flat_map(|item| synthesize_keys(item, path))
            .collect(),
        Value::Object(entries) => entries
            .iter()
            .flat_map(|(key, child)| {
                let mut child_path = path.to_vec();
                child_path.push(key.as_str());
                synthesize_keys(child, &child_path)
            })
            .collect(),
        scalar => match scalar_text(scalar) {
            Some(text) => {
                let mut parts = path.to_vec();
                parts.push(text.as_str());
                vec![parts.join(SEPARATOR)]
            },
            None => Vec::new(),
        },
    }
}

/// Keys contributed by a single rule.
///
/// # Errors
///
/// Returns [`AccessRuleError::NotARule`] if `rule` is a scalar.
pub fn rule_keys(rule: &Value) -> Result<BTreeSet<String>, AccessRuleError> {
    match rule {
        Value::Null => Ok(BTreeSet::new()),
        Value::Array(rules) => {
            let mut keys = BTreeSet::new();
            for nested in rules {
                keys.extend(rule_keys(nested)?);
            }
            Ok(keys)
        },
        Value::Object(entries) => {
            let prefix = entries
                .get(ACCESS_TYPE_KEY)
                .and_then(scalar_text)
                .map(|access_type| format!("access{SEPARATOR}{access_type}"));

            let leaf_keys: BTreeSet<String> = entries
                .iter()
                .filter(|(key, _)| !(prefix.is_some() && key.as_str() == ACCESS_TYPE_KEY))
                .flat_map(|(key, child)| synthesize_keys(child, &[key.as_str()]))
                .collect();

            Ok(match prefix {
                Some(prefix) if leaf_keys.is_empty() => BTreeSet::from([prefix]),
                Some(prefix) => leaf_keys
                    .into_iter()
                    .map(|key| format!("{prefix}{SEPARATOR}{key}"))
                    .collect(),
                None => leaf_keys,
            })
        },
        scalar => Err(AccessRuleError::NotARule {
            found: json_type_name(scalar),
        }),
    }
}

/// Flatten a list of access restriction rules into boolean keys.
///
/// Every key produced by any rule is present in the result, mapped to `1`.
///
/// # Errors
///
/// Returns [`AccessRuleError::NotARule`] if any rule is a scalar.
///
/// # Examples
///
/// ```
/// use ovgis_core::access::flatten_dict_to_bool_keys;
/// use serde_json::json;
///
/// let rules = vec![json!({"access_type": "denied", "when": {"heading": "backward"}})];
/// let keys = flatten_dict_to_bool_keys(&rules).unwrap();
/// assert_eq!(keys.len(), 1);
/// assert_eq!(keys["access_denied_when_heading_backward"], 1);
/// ```
pub fn flatten_dict_to_bool_keys(rules: &[Value]) -> Result<BTreeMap<String, u8>, AccessRuleError> {
    let mut flags = BTreeMap::new();
    for rule in rules {
        for key in rule_keys(rule)? {
            flags.insert(key, 1);
        }
    }
    Ok(flags)
}
