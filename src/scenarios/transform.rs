//! Named value transforms applied to entity values before they reach a request

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;
use std::fmt::Write;

use super::TransformError;

/// A parsed transform name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Lowercase,
    Uppercase,
    Trim,
    Integer,
    Float,
    Boolean,
    /// `date_format:<input pattern>:<output pattern>`
    DateFormat { input: String, output: String },
    /// Unrecognized names leave the value unchanged
    Passthrough(String),
}

impl Transform {
    pub fn parse(name: &str) -> Self {
        match name {
            "lowercase" => Transform::Lowercase,
            "uppercase" => Transform::Uppercase,
            "trim" => Transform::Trim,
            "int" | "integer" => Transform::Integer,
            "float" | "number" => Transform::Float,
            "bool" | "boolean" => Transform::Boolean,
            other => match other.strip_prefix("date_format:") {
                // The output pattern may itself contain ':' (e.g. `%H:%M`)
                Some(patterns) => match patterns.split_once(':') {
                    Some((input, output)) => Transform::DateFormat {
                        input: input.to_string(),
                        output: output.to_string(),
                    },
                    None => Transform::Passthrough(other.to_string()),
                },
                None => Transform::Passthrough(other.to_string()),
            },
        }
    }

    pub fn apply(&self, value: &JsonValue) -> Result<JsonValue, TransformError> {
        let transformed = match self {
            Transform::Lowercase => JsonValue::String(text_of(value).to_lowercase()),
            Transform::Uppercase => JsonValue::String(text_of(value).to_uppercase()),
            Transform::Trim => JsonValue::String(text_of(value).trim().to_string()),
            Transform::Integer => JsonValue::from(to_integer(value)?),
            Transform::Float => to_float(value)?,
            Transform::Boolean => {
                let text = text_of(value).to_lowercase();
                JsonValue::Bool(matches!(text.as_str(), "true" | "1" | "yes"))
            }
            Transform::DateFormat { input, output } => {
                reformat_date(&text_of(value), input, output)
                    .map(JsonValue::String)
                    .unwrap_or_else(|| value.clone())
            }
            Transform::Passthrough(_) => value.clone(),
        };
        Ok(transformed)
    }
}

/// Apply an optional transform by name
pub fn apply_transform(
    value: &JsonValue,
    transform: Option<&str>,
) -> Result<JsonValue, TransformError> {
    match transform {
        Some(name) if !name.is_empty() => Transform::parse(name).apply(value),
        _ => Ok(value.clone()),
    }
}

/// Textual form of a value: strings verbatim, everything else as JSON text
pub fn text_of(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(true) => "True".to_string(),
        JsonValue::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

/// Parse `text` with a strftime pattern, accepting date-only patterns at midnight
pub fn parse_datetime(text: &str, pattern: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, pattern).ok().or_else(|| {
        NaiveDate::parse_from_str(text, pattern)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

/// Format a timestamp, returning `None` for an invalid pattern instead of panicking
pub fn format_datetime(datetime: &NaiveDateTime, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", datetime.format(pattern)).ok()?;
    Some(out)
}

fn reformat_date(text: &str, input: &str, output: &str) -> Option<String> {
    let parsed = parse_datetime(text, input)?;
    format_datetime(&parsed, output)
}

fn to_integer(value: &JsonValue) -> Result<i64, TransformError> {
    let fail = || TransformError::Integer {
        value: value.to_string(),
    };
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(fail),
        JsonValue::Bool(b) => Ok(i64::from(*b)),
        JsonValue::String(s) => s.trim().parse::<i64>().map_err(|_| fail()),
        _ => Err(fail()),
    }
}

fn to_float(value: &JsonValue) -> Result<JsonValue, TransformError> {
    let fail = || TransformError::Float {
        value: value.to_string(),
    };
    let number = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .ok_or_else(fail)
}
