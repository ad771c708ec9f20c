//! Comparison grammar shared by the filter engine and criteria search.
//!
//! Operators arrive as strings (`"eq"`, `"between"`, `"startsWith"`, ...) and
//! are parsed once into [`Operator`]. Unrecognized names are kept verbatim and
//! evaluate as strict equality.

use std::cmp::Ordering;
use std::fmt;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QueryError, Result};
use crate::model::stringify;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Between,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    Unrecognized(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Nin => "nin",
            Self::Between => "between",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Regex => "regex",
            Self::Unrecognized(name) => name,
        }
    }
}

impl From<&str> for Operator {
    fn from(name: &str) -> Self {
        match name {
            "eq" | "=" | "==" => Self::Eq,
            "ne" | "!=" => Self::Ne,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "in" => Self::In,
            "nin" => Self::Nin,
            "between" => Self::Between,
            "contains" => Self::Contains,
            "startsWith" => Self::StartsWith,
            "endsWith" => Self::EndsWith,
            "regex" => Self::Regex,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluate `item <operator> filter`, failing the predicate closed on a
/// malformed filter value.
pub fn apply_operator(item: &Value, filter: &Value, operator: &Operator) -> bool {
    match try_apply_operator(item, filter, operator) {
        Ok(matched) => matched,
        Err(err) => {
            tracing::debug!(%operator, error = %err, "predicate failed closed");
            false
        }
    }
}

/// Like [`apply_operator`], but reports shape errors instead of returning `false`.
pub fn try_apply_operator(item: &Value, filter: &Value, operator: &Operator) -> Result<bool> {
    let matched = match operator {
        Operator::Eq | Operator::Unrecognized(_) => strict_eq(item, filter),
        Operator::Ne => !strict_eq(item, filter),
        Operator::Gt => compare(item, filter) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            compare(item, filter),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => compare(item, filter) == Some(Ordering::Less),
        Operator::Lte => matches!(
            compare(item, filter),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::In => members(filter, operator)?
            .iter()
            .any(|v| strict_eq(item, v)),
        Operator::Nin => !members(filter, operator)?
            .iter()
            .any(|v| strict_eq(item, v)),
        Operator::Between => {
            let bounds = members(filter, operator)?;
            let [min, max] = bounds else {
                return Err(QueryError::Validation(format!(
                    "between expects [min, max], got {} values",
                    bounds.len()
                )));
            };
            matches!(
                compare(item, min),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(compare(item, max), Some(Ordering::Less | Ordering::Equal))
        }
        Operator::Contains => lower(item).contains(&lower(filter)),
        Operator::StartsWith => lower(item).starts_with(&lower(filter)),
        Operator::EndsWith => lower(item).ends_with(&lower(filter)),
        Operator::Regex => {
            let pattern = stringify(filter);
            let re = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| QueryError::Validation(format!("invalid regex `{pattern}`: {e}")))?;
            re.is_match(&stringify(item))
        }
    };
    Ok(matched)
}

fn members<'a>(filter: &'a Value, operator: &Operator) -> Result<&'a [Value]> {
    filter.as_array().map(Vec::as_slice).ok_or_else(|| {
        QueryError::Validation(format!("`{operator}` expects an array, got {filter}"))
    })
}

fn lower(value: &Value) -> String {
    stringify(value).to_lowercase()
}

/// Type-and-value equality; numbers compare by value (`1 == 1.0`).
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Numeric order for two numbers, lexicographic for two strings, otherwise none.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// ============================================================================
// Field-level match specs
// ============================================================================

/// What a single criteria field may hold: `{operator, value}`, a set of
/// literals (membership), or one literal (strict equality).
///
/// Deserialization dispatches on JSON shape: an object carrying `operator` is
/// an operator match, an array is a set, anything else is a literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValueMatch {
    Operator { operator: Operator, value: Value },
    Set(Vec<Value>),
    Literal(Value),
}

impl ValueMatch {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Set(values.into_iter().map(Into::into).collect())
    }

    pub fn op(operator: impl Into<Operator>, value: impl Into<Value>) -> Self {
        Self::Operator {
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, item: &Value) -> bool {
        match self {
            Self::Operator { operator, value } => apply_operator(item, value, operator),
            Self::Set(values) => values.iter().any(|v| strict_eq(item, v)),
            Self::Literal(value) => strict_eq(item, value),
        }
    }
}

impl From<Value> for ValueMatch {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => Self::Set(values),
            Value::Object(mut map) if map.contains_key("operator") => {
                let operator = match map.remove("operator") {
                    Some(Value::String(name)) => Operator::from(name),
                    Some(other) => Operator::Unrecognized(other.to_string()),
                    None => Operator::Eq,
                };
                let value = map.remove("value").unwrap_or(Value::Null);
                Self::Operator { operator, value }
            }
            other => Self::Literal(other),
        }
    }
}

impl<'de> Deserialize<'de> for ValueMatch {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(name: &str) -> Operator {
        Operator::from(name)
    }

    #[test]
    fn equality_aliases() {
        for name in ["eq", "=", "=="] {
            assert_eq!(op(name), Operator::Eq);
            assert!(apply_operator(&json!(3), &json!(3.0), &op(name)));
        }
        assert!(apply_operator(&json!("a"), &json!("b"), &op("!=")));
        assert!(!apply_operator(&json!(1), &json!("1"), &op("eq")));
    }

    #[test]
    fn ordering_is_numeric_or_lexicographic() {
        assert!(apply_operator(&json!(10), &json!(9), &op("gt")));
        assert!(apply_operator(&json!("b"), &json!("a"), &op("gte")));
        assert!(apply_operator(&json!(2), &json!(2), &op("lte")));
        assert!(!apply_operator(&json!("10"), &json!(9), &op("gt")));
    }

    #[test]
    fn membership_and_range() {
        assert!(apply_operator(&json!("x"), &json!(["x", "y"]), &op("in")));
        assert!(apply_operator(&json!("z"), &json!(["x", "y"]), &op("nin")));
        assert!(apply_operator(&json!(5), &json!([1, 5]), &op("between")));
        assert!(!apply_operator(&json!(6), &json!([1, 5]), &op("between")));
    }

    #[test]
    fn malformed_shapes_fail_closed() {
        assert!(!apply_operator(&json!(5), &json!([1]), &op("between")));
        assert!(!apply_operator(&json!(5), &json!(5), &op("between")));
        assert!(!apply_operator(&json!("x"), &json!("x"), &op("in")));
        assert!(!apply_operator(&json!("x"), &json!("x"), &op("nin")));
        assert!(matches!(
            try_apply_operator(&json!(5), &json!([1, 2, 3]), &op("between")),
            Err(QueryError::Validation(_))
        ));
    }

    #[test]
    fn string_operators_ignore_case() {
        assert!(apply_operator(&json!("NAS Device"), &json!("device"), &op("contains")));
        assert!(apply_operator(&json!("NAS Device"), &json!("nas"), &op("startsWith")));
        assert!(apply_operator(&json!(1024), &json!("24"), &op("endsWith")));
        assert!(apply_operator(&json!("RAID-5"), &json!("^raid-\\d$"), &op("regex")));
        assert!(!apply_operator(&json!("RAID"), &json!("(unclosed"), &op("regex")));
    }

    #[test]
    fn unrecognized_operator_falls_back_to_equality() {
        let weird = op("approx");
        assert_eq!(weird, Operator::Unrecognized("approx".to_string()));
        assert!(apply_operator(&json!(1), &json!(1), &weird));
        assert!(!apply_operator(&json!(1), &json!(2), &weird));
    }

    #[test]
    fn value_match_shapes_deserialize() {
        let by_op: ValueMatch =
            serde_json::from_value(json!({"operator": "gt", "value": 3})).unwrap();
        assert_eq!(by_op, ValueMatch::op("gt", 3));
        let by_set: ValueMatch = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(by_set, ValueMatch::one_of(["a", "b"]));
        assert!(by_set.matches(&json!("a")));
        let by_literal: ValueMatch = serde_json::from_value(json!("concept")).unwrap();
        assert_eq!(by_literal, ValueMatch::literal("concept"));
    }
}
