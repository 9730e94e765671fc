//! Type coercion between wire fields and native values
//!
//! - Numeric fields parse at the declared width; out of range is an error
//! - Character fields are copied after un-quoting and un-escaping
//! - Identifier fields accept both the legacy and the modern encoding
//! - Unquoted empty fields are absent (`Value::Null`) unless the column is
//!   non-nullable
//!
//! Coercion is pure: no logging, no shared state.

mod ilwd;
mod value;

pub use ilwd::{format_identifier, parse_identifier, IlwdPolicy, Owner};
pub use value::Value;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{Column, ColumnType};

/// Quote and escape characters of the stream encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quoting {
    pub quote: char,
    pub escape: char,
}

impl Default for Quoting {
    fn default() -> Self {
        Self {
            quote: '"',
            escape: '\\',
        }
    }
}

/// Failure to turn one field into a value, without row context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("{reason}")]
    Mismatch { value: String, reason: String },

    #[error("empty value in non-nullable column")]
    Null,
}

impl CoercionError {
    fn mismatch(value: &str, reason: impl Into<String>) -> Self {
        CoercionError::Mismatch {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Un-quoted, un-escaped field text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldText {
    pub text: String,
    pub quoted: bool,
}

/// Strips surrounding whitespace and quotes and resolves escapes.
pub fn unquote(raw: &str, quoting: Quoting) -> Result<FieldText, String> {
    let raw = raw.trim();
    let mut text = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    let quoted = raw.starts_with(quoting.quote);
    if quoted {
        chars.next();
    }

    let mut closed = false;
    while let Some(c) = chars.next() {
        if c == quoting.escape {
            let escaped = chars
                .next()
                .ok_or_else(|| "dangling escape character".to_string())?;
            text.push(escaped);
        } else if c == quoting.quote {
            if !quoted {
                return Err("unescaped quote inside unquoted field".into());
            }
            closed = true;
            break;
        } else {
            text.push(c);
        }
    }

    if quoted {
        if !closed {
            return Err("unterminated quoted field".into());
        }
        if !chars.as_str().trim().is_empty() {
            return Err("characters after closing quote".into());
        }
    }

    Ok(FieldText { text, quoted })
}

/// Converts raw stream fields into native values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coercer {
    pub quoting: Quoting,
    pub ilwd_policy: IlwdPolicy,
}

impl Coercer {
    pub fn new(quoting: Quoting, ilwd_policy: IlwdPolicy) -> Self {
        Self {
            quoting,
            ilwd_policy,
        }
    }

    /// Coerces a raw field of `column` in `table`.
    pub fn coerce(&self, raw: &str, table: &str, column: &Column) -> Result<Value, CoercionError> {
        let field = unquote(raw, self.quoting).map_err(|reason| CoercionError::mismatch(raw, reason))?;

        let absent = field.text.is_empty() && !(field.quoted && column.column_type.is_text());
        if absent {
            if column.nullable {
                return Ok(Value::Null);
            }
            return Err(CoercionError::Null);
        }

        let owner = Owner {
            table,
            column: &column.name,
        };
        coerce_text(&field.text, column.column_type, Some(owner), self.ilwd_policy)
    }
}

/// Coerces already un-quoted, non-empty text to `column_type`.
pub fn coerce_text(
    text: &str,
    column_type: ColumnType,
    owner: Option<Owner<'_>>,
    ilwd_policy: IlwdPolicy,
) -> Result<Value, CoercionError> {
    fn parse_as<T: std::str::FromStr>(text: &str) -> Result<T, CoercionError>
    where
        T::Err: std::fmt::Display,
    {
        text.trim()
            .parse::<T>()
            .map_err(|e| CoercionError::mismatch(text, e.to_string()))
    }

    let value = match column_type {
        ColumnType::Int1s => Value::Int8(parse_as(text)?),
        ColumnType::Int2s => Value::Int16(parse_as(text)?),
        ColumnType::Int4s => Value::Int32(parse_as(text)?),
        ColumnType::Int8s => Value::Int64(parse_as(text)?),
        ColumnType::Int1u => Value::UInt8(parse_as(text)?),
        ColumnType::Int2u => Value::UInt16(parse_as(text)?),
        ColumnType::Int4u => Value::UInt32(parse_as(text)?),
        ColumnType::Int8u => Value::UInt64(parse_as(text)?),
        ColumnType::Real4 => {
            let v: f32 = parse_as(text)?;
            check_finite(text, v.is_infinite(), column_type)?;
            Value::Real4(v)
        }
        ColumnType::Real8 => {
            let v: f64 = parse_as(text)?;
            check_finite(text, v.is_infinite(), column_type)?;
            Value::Real8(v)
        }
        ColumnType::CharS | ColumnType::CharV | ColumnType::LString => {
            Value::Text(text.to_string())
        }
        ColumnType::Ilwd => Value::Int64(
            parse_identifier(text.trim(), owner, ilwd_policy)
                .map_err(|reason| CoercionError::mismatch(text, reason))?,
        ),
    };

    Ok(value)
}

/// Finite text that overflows to infinity is out of range; `inf` itself is not.
fn check_finite(text: &str, infinite: bool, column_type: ColumnType) -> Result<(), CoercionError> {
    if !infinite {
        return Ok(());
    }
    let literal = text.trim().trim_start_matches(['+', '-']).to_ascii_lowercase();
    if literal == "inf" || literal == "infinity" {
        return Ok(());
    }
    Err(CoercionError::mismatch(
        text,
        format!("out of range for {}", column_type),
    ))
}

/// Wire text for a value, the inverse of [`Coercer::coerce`].
///
/// Character data is always quoted. Identifiers of an `ilwd:char` column are
/// written in the legacy form when an owner is given.
pub fn encode(value: &Value, column_type: ColumnType, owner: Option<Owner<'_>>, quoting: Quoting) -> String {
    match (value, column_type) {
        (Value::Null, _) => String::new(),
        (Value::Text(s), _) => quote(s, quoting),
        (Value::Int64(id), ColumnType::Ilwd) => match owner {
            Some(owner) => quote(&format_identifier(owner, *id), quoting),
            None => id.to_string(),
        },
        (other, _) => other.to_string(),
    }
}

fn quote(s: &str, quoting: Quoting) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quoting.quote);
    for c in s.chars() {
        if c == quoting.quote || c == quoting.escape {
            out.push(quoting.escape);
        }
        out.push(c);
    }
    out.push(quoting.quote);
    out
}

/// Coerces with the default quoting and strict identifier checks.
pub fn coerce(raw: &str, table: &str, column: &Column) -> Result<Value, CoercionError> {
    Coercer::default().coerce(raw, table, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: ColumnType) -> Column {
        Column::new(name, ty)
    }

    #[test]
    fn test_integer_widths() {
        assert_eq!(coerce("-5", "t", &col("a", ColumnType::Int1s)), Ok(Value::Int8(-5)));
        assert_eq!(coerce("70000", "t", &col("a", ColumnType::Int4s)), Ok(Value::Int32(70000)));
        assert_eq!(coerce(" 12 ", "t", &col("a", ColumnType::Int8u)), Ok(Value::UInt64(12)));
    }

    #[test]
    fn test_integer_out_of_range() {
        let err = coerce("300", "t", &col("a", ColumnType::Int1s)).unwrap_err();
        assert!(matches!(err, CoercionError::Mismatch { .. }));
        assert!(coerce("-1", "t", &col("a", ColumnType::Int2u)).is_err());
        assert!(coerce("1.5", "t", &col("a", ColumnType::Int4s)).is_err());
    }

    #[test]
    fn test_reals() {
        assert_eq!(coerce("1.25", "t", &col("a", ColumnType::Real4)), Ok(Value::Real4(1.25)));
        assert_eq!(coerce("1e-3", "t", &col("a", ColumnType::Real8)), Ok(Value::Real8(1e-3)));
        assert!(coerce("abc", "t", &col("a", ColumnType::Real8)).is_err());
    }

    #[test]
    fn test_real_overflow_is_mismatch() {
        let err = coerce("1e40", "t", &col("a", ColumnType::Real4)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert_eq!(
            coerce("-inf", "t", &col("a", ColumnType::Real4)),
            Ok(Value::Real4(f32::NEG_INFINITY))
        );
    }

    #[test]
    fn test_text_unescaped() {
        assert_eq!(
            coerce(r#""H1\,L1""#, "t", &col("ifos", ColumnType::LString)),
            Ok(Value::Text("H1,L1".into()))
        );
        assert_eq!(
            coerce(r#""say \"hi\"""#, "t", &col("s", ColumnType::CharV)),
            Ok(Value::Text(r#"say "hi""#.into()))
        );
        assert_eq!(
            coerce(r"H1\,L1", "t", &col("ifos", ColumnType::LString)),
            Ok(Value::Text("H1,L1".into()))
        );
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(coerce("", "t", &col("a", ColumnType::Real4)), Ok(Value::Null));
        assert_eq!(coerce("  ", "t", &col("a", ColumnType::LString)), Ok(Value::Null));
        assert_eq!(
            coerce(r#""""#, "t", &col("a", ColumnType::LString)),
            Ok(Value::Text(String::new()))
        );
        assert_eq!(
            coerce("", "t", &Column::required("a", ColumnType::Int8s)),
            Err(CoercionError::Null)
        );
    }

    #[test]
    fn test_legacy_and_modern_identifiers_agree() {
        let column = col("event_id", ColumnType::Ilwd);
        for id in [0i64, 1, 42, 1_000_000_007, i64::MAX] {
            let legacy = format!("\"postcoh:event_id:{}\"", id);
            let modern = id.to_string();
            assert_eq!(
                coerce(&legacy, "postcoh", &column),
                coerce(&modern, "postcoh", &column)
            );
            assert_eq!(coerce(&modern, "postcoh", &column), Ok(Value::Int64(id)));
        }
    }

    #[test]
    fn test_identifier_foreign_prefix_rejected() {
        let column = col("event_id", ColumnType::Ilwd);
        assert!(coerce("\"sngl_inspiral:event_id:1\"", "postcoh", &column).is_err());

        let lenient = Coercer::new(Quoting::default(), IlwdPolicy::SuffixOnly);
        assert_eq!(
            lenient.coerce("\"sngl_inspiral:event_id:1\"", "postcoh", &column),
            Ok(Value::Int64(1))
        );
    }

    #[test]
    fn test_unquote_errors() {
        assert!(unquote("\"open", Quoting::default()).is_err());
        assert!(unquote("\"a\" b", Quoting::default()).is_err());
        assert!(unquote("a\\", Quoting::default()).is_err());

        let err = unquote("ab\"c", Quoting::default()).unwrap_err();
        assert!(err.contains("unquoted field"));
        assert_eq!(unquote("ab\\\"c", Quoting::default()).unwrap().text, "ab\"c");
    }

    #[test]
    fn test_encode_inverse() {
        let quoting = Quoting::default();
        let owner = Owner {
            table: "postcoh",
            column: "event_id",
        };
        assert_eq!(encode(&Value::Null, ColumnType::Real4, None, quoting), "");
        assert_eq!(
            encode(&Value::Text("a\"b".into()), ColumnType::LString, None, quoting),
            r#""a\"b""#
        );
        assert_eq!(
            encode(&Value::Int64(9), ColumnType::Ilwd, Some(owner), quoting),
            r#""postcoh:event_id:9""#
        );
        assert_eq!(encode(&Value::Int64(9), ColumnType::Int8s, Some(owner), quoting), "9");

        let text = encode(&Value::Text("x,\\y".into()), ColumnType::LString, None, quoting);
        assert_eq!(
            coerce(&text, "t", &col("s", ColumnType::LString)),
            Ok(Value::Text("x,\\y".into()))
        );
    }
}
