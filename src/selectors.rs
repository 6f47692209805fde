//! Label and field selectors for list requests
//!
//! Label selectors are parsed into `kube::core::Selector` and support the full
//! Kubernetes syntax:
//! - `key=value`, `key==value`, `key!=value`
//! - `key in (a,b)`, `key notin (a,b)`
//! - `key`, `!key`
//!
//! Requirements are separated by commas and combined with AND.
//!
//! Field selectors support the fields every resource has without an index:
//! `metadata.name` and `metadata.namespace`, with `=`, `==` and `!=`.

use kube::core::{Expression, Selector, SelectorExt};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Split on commas that are not inside a `(...)` value set.
fn requirements(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in selector.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(selector[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(selector[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn value_set(requirement: &str, values: &str) -> Result<BTreeSet<String>, String> {
    let inner = values
        .trim()
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| format!("invalid value set in requirement: {}", requirement))?;
    Ok(inner
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

fn parse_requirement(requirement: &str) -> Result<Expression, String> {
    if let Some((key, values)) = requirement.split_once(" notin ") {
        return Ok(Expression::NotIn(
            key.trim().to_string(),
            value_set(requirement, values)?,
        ));
    }
    if let Some((key, values)) = requirement.split_once(" in ") {
        return Ok(Expression::In(
            key.trim().to_string(),
            value_set(requirement, values)?,
        ));
    }
    if let Some((key, value)) = requirement.split_once("!=") {
        return Ok(Expression::NotEqual(
            key.trim().to_string(),
            value.trim().to_string(),
        ));
    }
    if let Some((key, value)) = requirement
        .split_once("==")
        .or_else(|| requirement.split_once('='))
    {
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("missing key in requirement: {}", requirement));
        }
        return Ok(Expression::Equal(key.to_string(), value.trim().to_string()));
    }
    if let Some(key) = requirement.strip_prefix('!') {
        return Ok(Expression::DoesNotExist(key.trim().to_string()));
    }
    Ok(Expression::Exists(requirement.to_string()))
}

/// Parse a label selector string. An empty string selects everything.
///
/// ```
/// use kube_mock_server::selectors::parse_label_selector;
///
/// assert!(parse_label_selector("tier=gold,zone in (a,b)").is_ok());
/// assert!(parse_label_selector("zone in a,b").is_err());
/// ```
pub fn parse_label_selector(selector: &str) -> Result<Selector, String> {
    requirements(selector)
        .into_iter()
        .map(parse_requirement)
        .collect::<Result<Vec<_>, _>>()
        .map(Selector::from_iter)
}

/// Check a label map against a selector string.
///
/// ```
/// use std::collections::BTreeMap;
/// use kube_mock_server::selectors::matches_labels;
///
/// let labels = BTreeMap::from([("tier".to_string(), "gold".to_string())]);
/// assert!(matches_labels(&labels, "tier=gold").unwrap());
/// assert!(!matches_labels(&labels, "tier notin (gold)").unwrap());
/// ```
pub fn matches_labels(labels: &BTreeMap<String, String>, selector: &str) -> Result<bool, String> {
    Ok(parse_label_selector(selector)?.matches(labels))
}

fn object_labels(obj: &Value) -> BTreeMap<String, String> {
    obj.get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(|l| l.as_object())
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Check a raw JSON object's `metadata.labels` against a parsed selector.
pub fn object_matches_labels(obj: &Value, selector: &Selector) -> bool {
    selector.matches(&object_labels(obj))
}

/// A single `field=value` or `field!=value` requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequirement {
    pub field: String,
    pub value: String,
    pub negated: bool,
}

/// Parse a field selector. Only `metadata.name` and `metadata.namespace` are
/// accepted, as those are the fields every resource supports.
pub fn parse_field_selector(selector: &str) -> Result<Vec<FieldRequirement>, String> {
    requirements(selector)
        .into_iter()
        .map(|requirement| {
            let (field, value, negated) = if let Some((f, v)) = requirement.split_once("!=") {
                (f, v, true)
            } else if let Some((f, v)) = requirement
                .split_once("==")
                .or_else(|| requirement.split_once('='))
            {
                (f, v, false)
            } else {
                return Err(format!("invalid field selector: {}", requirement));
            };

            let field = field.trim();
            if !matches!(field, "metadata.name" | "metadata.namespace") {
                return Err(format!("field label not supported: {}", field));
            }
            Ok(FieldRequirement {
                field: field.to_string(),
                value: value.trim().to_string(),
                negated,
            })
        })
        .collect()
}

/// Check a raw JSON object against parsed field requirements.
pub fn object_matches_fields(obj: &Value, requirements: &[FieldRequirement]) -> bool {
    requirements.iter().all(|req| {
        let key = req.field.trim_start_matches("metadata.");
        let actual = obj
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        (actual == req.value) != req.negated
    })
}
