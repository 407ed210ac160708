//! Answer normalization: coerce whatever the model returned into the declared type.

use serde_json::Value;
use tracing::debug;

use crate::literal::{looks_like_list, parse_int, parse_list, Literal};
use crate::types::{AnswerType, AnswerValue};

/// Text used when a string answer is missing entirely.
pub const NO_RESPONSE: &str = "Error: No response";

/// Coerce `raw` to `ty`. Never fails; unusable input becomes the type default.
pub fn normalize(raw: &Value, ty: AnswerType) -> AnswerValue {
    let raw = unwrap_answer(raw);
    match ty {
        AnswerType::Int => AnswerValue::Int(to_int(raw).unwrap_or(0)),
        AnswerType::Bool => AnswerValue::Bool(to_bool(raw)),
        AnswerType::Str => AnswerValue::Str(to_str(raw)),
        AnswerType::IntArray => AnswerValue::IntArray(to_int_array(raw)),
        AnswerType::StrArray => AnswerValue::StrArray(to_str_array(raw)),
    }
}

fn unwrap_answer(raw: &Value) -> &Value {
    match raw {
        Value::Object(map) => match map.get("answer") {
            Some(inner) => unwrap_answer(inner),
            None => raw,
        },
        _ => raw,
    }
}

fn to_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => parse_int(s),
        _ => None,
    }
}

fn to_bool(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 1.0),
        _ => false,
    }
}

fn scalar_text(raw: &Value) -> Option<String> {
    match raw {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn to_str(raw: &Value) -> String {
    match raw {
        Value::Null => NO_RESPONSE.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(other).unwrap_or_else(|| NO_RESPONSE.to_string()),
    }
}

fn to_int_array(raw: &Value) -> Vec<i64> {
    match raw {
        Value::Array(items) => items.iter().filter_map(to_int).collect(),
        Value::String(s) if looks_like_list(s) => match parse_list(s) {
            Some(items) => {
                let parsed: Option<Vec<i64>> = items.iter().map(Literal::as_int).collect();
                parsed.unwrap_or_else(|| {
                    debug!("List answer has non-integer items, using []");
                    Vec::new()
                })
            }
            None => Vec::new(),
        },
        other => to_int(other).into_iter().collect(),
    }
}

fn to_str_array(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::String(s) if looks_like_list(s) => parse_list(s)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Literal::into_text)
            .collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::Null => Vec::new(),
        other => scalar_text(other).into_iter().collect(),
    }
}
