// SPDX-License-Identifier: MIT

//! Condition evaluation for branch nodes
//!
//! A condition compares one context field against a configured value:
//! `field operator value`, with operators `==`, `!=`, `contains`, `>`,
//! `<`. Numeric comparison applies when both sides parse as numbers;
//! otherwise values compare as strings.

use serde_json::Value;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOp {
    /// ==
    Eq,
    /// !=
    NotEq,
    /// contains (substring, or array membership)
    Contains,
    /// >
    Gt,
    /// <
    Lt,
}

impl CompareOp {
    /// Parse an operator from its config spelling. Unknown operators
    /// degrade to `==` rather than failing the node.
    pub fn parse(op: &str) -> Self {
        match op.trim() {
            "!=" => CompareOp::NotEq,
            "contains" => CompareOp::Contains,
            ">" => CompareOp::Gt,
            "<" => CompareOp::Lt,
            "==" | "=" => CompareOp::Eq,
            other => {
                log::warn!("Unknown condition operator '{}', defaulting to ==", other);
                CompareOp::Eq
            }
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::NotEq => write!(f, "!="),
            CompareOp::Contains => write!(f, "contains"),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Lt => write!(f, "<"),
        }
    }
}

/// Evaluate a comparison between a context value and the configured
/// expected value. A missing field compares as the empty string.
pub fn evaluate(actual: Option<&Value>, op: CompareOp, expected: &str) -> bool {
    match op {
        CompareOp::Eq => values_equal(actual, expected),
        CompareOp::NotEq => !values_equal(actual, expected),
        CompareOp::Contains => check_contains(actual, expected),
        CompareOp::Gt => compare_numbers(actual, expected, |a, b| a > b),
        CompareOp::Lt => compare_numbers(actual, expected, |a, b| a < b),
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn values_equal(actual: Option<&Value>, expected: &str) -> bool {
    let actual_text = actual.map(value_as_text).unwrap_or_default();
    // Numeric equality when both sides are numbers (80 == "80.0")
    if let (Ok(a), Ok(b)) = (actual_text.parse::<f64>(), expected.parse::<f64>()) {
        return (a - b).abs() < f64::EPSILON;
    }
    actual_text == expected
}

fn compare_numbers<F>(actual: Option<&Value>, expected: &str, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    let actual_num = match actual {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match (actual_num, expected.trim().parse::<f64>()) {
        (Some(a), Ok(b)) => cmp(a, b),
        _ => false,
    }
}

fn check_contains(actual: Option<&Value>, expected: &str) -> bool {
    match actual {
        Some(Value::String(s)) => s.contains(expected),
        Some(Value::Array(items)) => items.iter().any(|v| value_as_text(v) == expected),
        _ => false,
    }
}
