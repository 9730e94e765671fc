//! Native column values

use std::fmt;

use serde::Serialize;

use crate::schema::NativeKind;

/// A decoded field.
///
/// Integer and real variants keep the declared width so that converting a
/// table into another tabular structure loses nothing. Identifiers, legacy
/// or modern, decode to `Int64`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value (empty field)
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Real4(f32),
    Real8(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Native kind of a present value; `None` for `Null`.
    pub fn kind(&self) -> Option<NativeKind> {
        let kind = match self {
            Value::Null => return None,
            Value::Int8(_) => NativeKind::Int8,
            Value::Int16(_) => NativeKind::Int16,
            Value::Int32(_) => NativeKind::Int32,
            Value::Int64(_) => NativeKind::Int64,
            Value::UInt8(_) => NativeKind::UInt8,
            Value::UInt16(_) => NativeKind::UInt16,
            Value::UInt32(_) => NativeKind::UInt32,
            Value::UInt64(_) => NativeKind::UInt64,
            Value::Real4(_) => NativeKind::Real4,
            Value::Real8(_) => NativeKind::Real8,
            Value::Text(_) => NativeKind::Text,
        };
        Some(kind)
    }

    /// Signed view of any integer value that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::UInt8(v) => Some(i64::from(*v)),
            Value::UInt16(v) => Some(i64::from(*v)),
            Value::UInt32(v) => Some(i64::from(*v)),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real4(v) => Some(f64::from(*v)),
            Value::Real8(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            // Debug gives the shortest text that parses back to the same float
            Value::Real4(v) => write!(f, "{:?}", v),
            Value::Real8(v) => write!(f, "{:?}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(Value::Int64(3).kind(), Some(NativeKind::Int64));
        assert_eq!(Value::Text("H1".into()).kind(), Some(NativeKind::Text));
        assert_eq!(Value::Null.kind(), None);
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::UInt32(7).as_i64(), Some(7));
        assert_eq!(Value::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(Value::Real4(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::Int16(-2).as_f64(), Some(-2.0));
        assert_eq!(Value::Text("x".into()).as_i64(), None);
    }

    #[test]
    fn test_display_round_trips_floats() {
        let v = 0.1f32;
        let text = Value::Real4(v).to_string();
        assert_eq!(text.parse::<f32>().unwrap(), v);
        assert_eq!(Value::Real8(1e300).to_string(), "1e300");
    }

    #[test]
    fn test_json_is_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Int64(5),
            Value::Null,
            Value::Text("H1L1".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"[5,null,"H1L1"]"#);
    }
}
