//! Value coercion and display formatting.
//!
//! Every value entering the engine goes through [`try_change_type`] before
//! it is committed, so downstream code only ever sees values matching the
//! field's declared kind. Conversion is tolerant where a person typing into
//! an editor would expect tolerance (trimmed numeric strings, "true"/"1"
//! for booleans, member names for enumerations) and strict everywhere else.

use std::fmt;

use crate::value::{EnumType, Value, ValueKind};

/// A value could not be coerced to a declared kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertError {
    /// Display rendering of the offending value.
    pub value: String,
    /// Display rendering of the target kind.
    pub target: String,
}

impl ConvertError {
    fn new(value: &Value, target: &ValueKind) -> Self {
        Self {
            value: format!("{value:?}"),
            target: target.to_string(),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot convert value {} to type {}",
            self.value, self.target
        )
    }
}

impl std::error::Error for ConvertError {}

/// Coerce `value` to `target`, or explain why it cannot be done.
///
/// `Null` converts to any nullable kind and to nothing else. Conversion to
/// `Str` always succeeds and produces the same text [`format_value`] would.
pub fn try_change_type(value: &Value, target: &ValueKind) -> Result<Value, ConvertError> {
    if let ValueKind::Nullable(inner) = target {
        if value.is_null() {
            return Ok(Value::Null);
        }
        return try_change_type(value, inner);
    }

    match target {
        ValueKind::Bool => convert_bool(value).ok_or_else(|| ConvertError::new(value, target)),
        ValueKind::I64 => convert_i64(value).ok_or_else(|| ConvertError::new(value, target)),
        ValueKind::U64 => convert_u64(value).ok_or_else(|| ConvertError::new(value, target)),
        ValueKind::F64 => convert_f64(value).ok_or_else(|| ConvertError::new(value, target)),
        ValueKind::Str => Ok(Value::Str(format_value(value))),
        ValueKind::Seq(element) => match value {
            Value::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(try_change_type(item, element)?);
                }
                Ok(Value::Seq(out))
            }
            _ => Err(ConvertError::new(value, target)),
        },
        ValueKind::Enum(ty) => {
            convert_enum(value, ty).ok_or_else(|| ConvertError::new(value, target))
        }
        ValueKind::Nullable(_) => unreachable!("handled above"),
    }
}

fn convert_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::I64(n) => Some(Value::Bool(*n != 0)),
        Value::U64(n) => Some(Value::Bool(*n != 0)),
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn convert_i64(value: &Value) -> Option<Value> {
    match value {
        Value::I64(n) => Some(Value::I64(*n)),
        Value::U64(n) => i64::try_from(*n).ok().map(Value::I64),
        Value::F64(n) if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 => {
            Some(Value::I64(*n as i64))
        }
        Value::Bool(b) => Some(Value::I64(i64::from(*b))),
        Value::Str(s) => s.trim().parse::<i64>().ok().map(Value::I64),
        Value::Enum { bits, .. } => i64::try_from(*bits).ok().map(Value::I64),
        _ => None,
    }
}

fn convert_u64(value: &Value) -> Option<Value> {
    match value {
        Value::U64(n) => Some(Value::U64(*n)),
        Value::I64(n) => u64::try_from(*n).ok().map(Value::U64),
        Value::F64(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u64::MAX as f64 => {
            Some(Value::U64(*n as u64))
        }
        Value::Bool(b) => Some(Value::U64(u64::from(*b))),
        Value::Str(s) => s.trim().parse::<u64>().ok().map(Value::U64),
        Value::Enum { bits, .. } => Some(Value::U64(*bits)),
        _ => None,
    }
}

fn convert_f64(value: &Value) -> Option<Value> {
    match value {
        Value::F64(n) => Some(Value::F64(*n)),
        Value::I64(n) => Some(Value::F64(*n as f64)),
        Value::U64(n) => Some(Value::F64(*n as f64)),
        Value::Bool(b) => Some(Value::F64(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s.trim().parse::<f64>().ok().map(Value::F64),
        _ => None,
    }
}

fn convert_enum(value: &Value, ty: &'static EnumType) -> Option<Value> {
    let bits = match value {
        Value::Enum { ty: from, bits } if *from == ty => Some(*bits),
        Value::U64(n) => Some(*n),
        Value::I64(n) => u64::try_from(*n).ok(),
        Value::Str(s) => parse_enum_text(s, ty),
        _ => None,
    }?;
    Some(Value::Enum { ty, bits })
}

/// Parse enum text: a member name, a comma-separated list of member names
/// for flags tables, or the numeric bit pattern.
fn parse_enum_text(text: &str, ty: &'static EnumType) -> Option<u64> {
    let text = text.trim();
    if let Some(member) = ty.member_by_name(text) {
        return Some(member.value);
    }
    if ty.flags && text.contains(',') {
        let mut bits = 0u64;
        for part in text.split(',') {
            bits |= ty.member_by_name(part.trim())?.value;
        }
        return Some(bits);
    }
    text.parse::<u64>().ok()
}

/// The bit pattern of a value interpreted as an enumeration, if it has one.
pub fn enum_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Enum { bits, .. } => Some(*bits),
        Value::U64(n) => Some(*n),
        Value::I64(n) => u64::try_from(*n).ok(),
        _ => None,
    }
}

/// Render a value for display.
///
/// `Null` renders as the empty string. Enumeration values render as member
/// names where the table covers the bit pattern, falling back to the raw
/// number where it does not.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::I64(n) => n.to_string(),
        Value::U64(n) => n.to_string(),
        Value::F64(n) => n.to_string(),
        Value::Str(s) => s.clone(),
        Value::Seq(items) => {
            let parts: Vec<String> = items.iter().map(format_value).collect();
            parts.join(", ")
        }
        Value::Enum { ty, bits } => format_enum(ty, *bits),
    }
}

fn format_enum(ty: &EnumType, bits: u64) -> String {
    if !ty.flags {
        return match ty.member(bits) {
            Some(m) => m.name.to_string(),
            None => bits.to_string(),
        };
    }
    if bits == 0 {
        return match ty.member(0) {
            Some(m) => m.name.to_string(),
            None => "0".to_string(),
        };
    }
    let mut names = Vec::new();
    let mut covered = 0u64;
    for member in ty.members.iter().filter(|m| m.value != 0) {
        if bits & member.value == member.value {
            names.push(member.name);
            covered |= member.value;
        }
    }
    if covered != bits {
        return bits.to_string();
    }
    names.join(", ")
}

/// Turn an identifier into words: `IsReadOnly` and `is_read_only` both
/// become `Is Read Only`. Acronym runs are kept together.
pub fn decamelize(name: &str) -> String {
    if name.contains('_') {
        return name
            .split('_')
            .filter(|part| !part.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ");
    }
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push(' ');
            }
        }
        out.push(c);
    }
    capitalize_first(&out)
}

fn capitalize(word: &str) -> String {
    capitalize_first(word)
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
