//! Value formatting for the console.

use std::fmt::{self, Write as _};

use crate::target::Value;

/// Array elements shown before eliding the rest.
pub const ARRAY_PREVIEW_LIMIT: usize = 10;

/// Render a value as a single bounded line.
///
/// Strings are quoted, arrays show at most [`ARRAY_PREVIEW_LIMIT`] elements,
/// other objects render as `TypeName@id`.
#[must_use]
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(value) => value.to_string(),
        Value::Byte(value) => value.to_string(),
        Value::Char(value) => value.to_string(),
        Value::Short(value) => value.to_string(),
        Value::Int(value) => value.to_string(),
        Value::Long(value) => value.to_string(),
        Value::Float(value) => java_decimal(*value, f64::from(*value)),
        Value::Double(value) => java_decimal(*value, *value),
        Value::String(text) => format!("\"{text}\""),
        Value::Array {
            length, elements, ..
        } => format_array(*length, elements),
        Value::Object { type_name, id } => format!("{type_name}@{id}"),
    }
}

/// `Double.toString` layout: plain decimal for magnitudes in `[1e-3, 1e7)`,
/// `d.dddE±n` otherwise, always with a fractional digit.
fn java_decimal<T: fmt::Display + fmt::LowerExp>(value: T, wide: f64) -> String {
    if wide.is_nan() {
        return "NaN".to_string();
    }
    if wide.is_infinite() {
        return if wide > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = wide.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let mut text = value.to_string();
        if !text.contains('.') {
            text.push_str(".0");
        }
        return text;
    }
    let text = format!("{value:e}");
    let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
    if mantissa.contains('.') {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}.0E{exponent}")
    }
}

fn format_array(length: usize, elements: &[Value]) -> String {
    let shown = length.min(ARRAY_PREVIEW_LIMIT).min(elements.len());
    let mut out = format!("Array[len={length}][");
    for (index, element) in elements.iter().take(shown).enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push_str(&format_value(element));
    }
    if length > shown {
        let _ = write!(out, "{}...", if shown > 0 { ", " } else { "" });
    }
    out.push(']');
    out
}
