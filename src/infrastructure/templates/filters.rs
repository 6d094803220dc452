//! Custom Tera filters for answer templates

use chrono::DateTime;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Tera, Value};

use crate::scenarios::transform::{format_datetime, parse_datetime, text_of};

/// Text patterns tried in order by `format_date`
const DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d",
];

pub fn register(tera: &mut Tera) {
    tera.register_filter("format_number", format_number);
    tera.register_filter("format_currency", format_currency);
    tera.register_filter("format_date", format_date);
    tera.register_filter("truncate_text", truncate_text);
    tera.register_filter("json_pretty", json_pretty);
}

/// `1234.5 | format_number` -> `1,234.50`; zero decimal places truncate
pub fn format_number(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let decimals = int_arg(args, "decimal_places", 2);
    let formatted = match (as_number(value), decimals) {
        (Some(number), Some(0)) if number.is_finite() => {
            group_thousands(&format!("{:.0}", number.trunc()))
        }
        (Some(number), Some(places)) if number.is_finite() => {
            group_thousands(&format!("{number:.places$}"))
        }
        _ => text_of(value),
    };
    Ok(Value::String(formatted))
}

/// `100 | format_currency(currency='USD')` -> `$100`
pub fn format_currency(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let currency = str_arg(args, "currency").unwrap_or_else(|| "VND".to_string());
    let decimals = int_arg(args, "decimal_places", 0);

    let formatted = match (as_number(value), decimals) {
        (Some(number), Some(places)) if number.is_finite() => {
            let amount = group_thousands(&format!("{number:.places$}"));
            match currency.as_str() {
                "VND" => format!("{amount} ₫"),
                "USD" => format!("${amount}"),
                "EUR" => format!("€{amount}"),
                other => format!("{amount} {other}"),
            }
        }
        _ => text_of(value),
    };
    Ok(Value::String(formatted))
}

/// Reformat a timestamp given as Unix seconds or as text in a common pattern
pub fn format_date(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let pattern = str_arg(args, "format").unwrap_or_else(|| "%d/%m/%Y".to_string());

    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc()),
        Value::String(text) => DATE_PATTERNS
            .iter()
            .find_map(|candidate| parse_datetime(text, candidate)),
        _ => None,
    };

    let formatted = parsed
        .and_then(|datetime| format_datetime(&datetime, &pattern))
        .unwrap_or_else(|| text_of(value));
    Ok(Value::String(formatted))
}

/// Cap text at `length` characters, the suffix included
pub fn truncate_text(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let length = int_arg(args, "length", 100).unwrap_or(100);
    let suffix = str_arg(args, "suffix").unwrap_or_else(|| "...".to_string());
    let text = text_of(value);

    let char_count = text.chars().count();
    if char_count <= length {
        return Ok(Value::String(text));
    }

    let suffix_len = suffix.chars().count();
    let keep = if length >= suffix_len {
        length - suffix_len
    } else {
        // Limit shorter than the suffix: cut the overflow from the end
        char_count.saturating_sub(suffix_len - length)
    };
    let truncated: String = text.chars().take(keep).collect();
    Ok(Value::String(truncated + &suffix))
}

/// Indented JSON dump, non-ASCII characters kept as-is
pub fn json_pretty(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let indent = int_arg(args, "indent", 2).unwrap_or(2);
    let indent = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);

    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    let pretty = value
        .serialize(&mut serializer)
        .ok()
        .and_then(|_| String::from_utf8(buffer).ok())
        .unwrap_or_else(|| text_of(value));
    Ok(Value::String(pretty))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Non-negative integer argument; `None` when present but unusable
fn int_arg(args: &HashMap<String, Value>, name: &str, default: usize) -> Option<usize> {
    match args.get(name) {
        None => Some(default),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    }
}

fn str_arg(args: &HashMap<String, Value>, name: &str) -> Option<String> {
    args.get(name).map(text_of)
}

/// Insert `,` separators into the integer part of a formatted number
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // `-0` after truncation or rounding prints without a sign
    let sign = if grouped.chars().all(|c| c == '0' || c == ',')
        && fraction.is_none_or(|f| f.chars().all(|c| c == '0'))
    {
        ""
    } else {
        sign
    };

    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn call(
        filter: fn(&Value, &HashMap<String, Value>) -> tera::Result<Value>,
        value: Value,
        pairs: &[(&str, Value)],
    ) -> String {
        filter(&value, &args(pairs))
            .unwrap()
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(call(format_number, json!(1234567.891), &[]), "1,234,567.89");
        assert_eq!(
            call(format_number, json!(1234567.891), &[("decimal_places", json!(0))]),
            "1,234,567"
        );
        assert_eq!(call(format_number, json!("-9876.5"), &[]), "-9,876.50");
        assert_eq!(call(format_number, json!(999), &[("decimal_places", json!(0))]), "999");
        assert_eq!(call(format_number, json!("n/a"), &[]), "n/a");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(call(format_currency, json!(1000), &[]), "1,000 ₫");
        assert_eq!(
            call(format_currency, json!(100), &[("currency", json!("USD"))]),
            "$100"
        );
        assert_eq!(
            call(
                format_currency,
                json!(1234.5),
                &[("currency", json!("EUR")), ("decimal_places", json!(2))]
            ),
            "€1,234.50"
        );
        assert_eq!(
            call(format_currency, json!(5000), &[("currency", json!("JPY"))]),
            "5,000 JPY"
        );
        assert_eq!(call(format_currency, json!(null), &[]), "null");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(call(format_date, json!("2024-03-05"), &[]), "05/03/2024");
        assert_eq!(
            call(
                format_date,
                json!("2024-03-05T14:30:00Z"),
                &[("format", json!("%Y/%m/%d %H:%M"))]
            ),
            "2024/03/05 14:30"
        );
        assert_eq!(
            call(format_date, json!("2024-03-05T14:30:00.123Z"), &[]),
            "05/03/2024"
        );
        assert_eq!(call(format_date, json!(0), &[]), "01/01/1970");
        assert_eq!(call(format_date, json!("next tuesday"), &[]), "next tuesday");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(call(truncate_text, json!("short"), &[]), "short");
        assert_eq!(
            call(truncate_text, json!("Hello, world"), &[("length", json!(8))]),
            "Hello..."
        );
        assert_eq!(
            call(
                truncate_text,
                json!("Xin chào thế giới"),
                &[("length", json!(9)), ("suffix", json!("…"))]
            ),
            "Xin chào…"
        );
    }

    #[test]
    fn test_json_pretty() {
        assert_eq!(
            call(json_pretty, json!({ "a": [1, 2], "b": "é" }), &[]),
            "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": \"é\"\n}"
        );
        assert_eq!(
            call(json_pretty, json!({ "a": 1 }), &[("indent", json!(4))]),
            "{\n    \"a\": 1\n}"
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1234567"), "1,234,567");
        assert_eq!(group_thousands("-1234.50"), "-1,234.50");
        assert_eq!(group_thousands("123"), "123");
        assert_eq!(group_thousands("-0.00"), "0.00");
    }
}
