//! Column and schema definitions
//!
//! Supported wire types:
//! - int_1s, int_2s, int_4s, int_8s: signed integers (8/16/32/64 bit)
//! - int_1u, int_2u, int_4u, int_8u: unsigned integers (8/16/32/64 bit)
//! - real_4, real_8: IEEE single/double
//! - char_s, char_v, lstring: fixed/variable length character data
//! - ilwd:char: legacy string-tagged row identifier

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coerce::Value;

/// Declared type of a column, named by its LIGO_LW wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "int_1s")]
    Int1s,
    #[serde(rename = "int_2s", alias = "short")]
    Int2s,
    #[serde(rename = "int_4s", alias = "int")]
    Int4s,
    #[serde(rename = "int_8s", alias = "long")]
    Int8s,
    #[serde(rename = "int_1u")]
    Int1u,
    #[serde(rename = "int_2u")]
    Int2u,
    #[serde(rename = "int_4u")]
    Int4u,
    #[serde(rename = "int_8u")]
    Int8u,
    #[serde(rename = "real_4", alias = "float")]
    Real4,
    #[serde(rename = "real_8", alias = "double")]
    Real8,
    #[serde(rename = "char_s")]
    CharS,
    #[serde(rename = "char_v")]
    CharV,
    #[serde(rename = "lstring", alias = "string")]
    LString,
    /// Legacy identifier, `"<table>:<column>:<integer>"` or a bare integer
    #[serde(rename = "ilwd:char")]
    Ilwd,
}

/// Native representation a column type decodes to.
///
/// Two column types with the same kind are losslessly coercible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Real4,
    Real8,
    Text,
}

impl ColumnType {
    /// Returns the canonical wire tag
    pub fn tag(&self) -> &'static str {
        match self {
            ColumnType::Int1s => "int_1s",
            ColumnType::Int2s => "int_2s",
            ColumnType::Int4s => "int_4s",
            ColumnType::Int8s => "int_8s",
            ColumnType::Int1u => "int_1u",
            ColumnType::Int2u => "int_2u",
            ColumnType::Int4u => "int_4u",
            ColumnType::Int8u => "int_8u",
            ColumnType::Real4 => "real_4",
            ColumnType::Real8 => "real_8",
            ColumnType::CharS => "char_s",
            ColumnType::CharV => "char_v",
            ColumnType::LString => "lstring",
            ColumnType::Ilwd => "ilwd:char",
        }
    }

    /// Parses a wire tag, accepting the common aliases.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let ty = match tag {
            "int_1s" => ColumnType::Int1s,
            "int_2s" | "short" => ColumnType::Int2s,
            "int_4s" | "int" => ColumnType::Int4s,
            "int_8s" | "long" => ColumnType::Int8s,
            "int_1u" => ColumnType::Int1u,
            "int_2u" => ColumnType::Int2u,
            "int_4u" => ColumnType::Int4u,
            "int_8u" => ColumnType::Int8u,
            "real_4" | "float" => ColumnType::Real4,
            "real_8" | "double" => ColumnType::Real8,
            "char_s" => ColumnType::CharS,
            "char_v" => ColumnType::CharV,
            "lstring" | "string" => ColumnType::LString,
            "ilwd:char" => ColumnType::Ilwd,
            _ => return None,
        };
        Some(ty)
    }

    pub fn native_kind(&self) -> NativeKind {
        match self {
            ColumnType::Int1s => NativeKind::Int8,
            ColumnType::Int2s => NativeKind::Int16,
            ColumnType::Int4s => NativeKind::Int32,
            ColumnType::Int8s | ColumnType::Ilwd => NativeKind::Int64,
            ColumnType::Int1u => NativeKind::UInt8,
            ColumnType::Int2u => NativeKind::UInt16,
            ColumnType::Int4u => NativeKind::UInt32,
            ColumnType::Int8u => NativeKind::UInt64,
            ColumnType::Real4 => NativeKind::Real4,
            ColumnType::Real8 => NativeKind::Real8,
            ColumnType::CharS | ColumnType::CharV | ColumnType::LString => NativeKind::Text,
        }
    }

    /// Whether values of this type are character data.
    pub fn is_text(&self) -> bool {
        self.native_kind() == NativeKind::Text
    }

    /// Whether two types decode to the same native representation.
    pub fn is_coercible_to(&self, other: ColumnType) -> bool {
        self.native_kind() == other.native_kind()
    }

    /// Modern equivalent of a legacy type (`ilwd:char` becomes `int_8s`).
    pub fn modernized(&self) -> ColumnType {
        match self {
            ColumnType::Ilwd => ColumnType::Int8s,
            other => *other,
        }
    }

    /// Fill value used when a row needs every column populated.
    ///
    /// Numbers (identifiers included) default to zero, character data to
    /// the empty string.
    pub fn default_value(&self) -> Value {
        match self.native_kind() {
            NativeKind::Int8 => Value::Int8(0),
            NativeKind::Int16 => Value::Int16(0),
            NativeKind::Int32 => Value::Int32(0),
            NativeKind::Int64 => Value::Int64(0),
            NativeKind::UInt8 => Value::UInt8(0),
            NativeKind::UInt16 => Value::UInt16(0),
            NativeKind::UInt32 => Value::UInt32(0),
            NativeKind::UInt64 => Value::UInt64(0),
            NativeKind::Real4 => Value::Real4(0.0),
            NativeKind::Real8 => Value::Real8(0.0),
            NativeKind::Text => Value::Text(String::new()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::from_tag(s).ok_or_else(|| format!("unknown column type '{}'", s))
    }
}

fn default_nullable() -> bool {
    true
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether an empty field is accepted (decoded as `Value::Null`)
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

impl Column {
    /// Create a nullable column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    /// Create a column that rejects empty fields
    pub fn required(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.column_type)?;
        if !self.nullable {
            write!(f, " not null")?;
        }
        Ok(())
    }
}

/// Ordered column list defining a table's row layout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Validates the schema structure itself (not a table)
    pub fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err("schema must declare at least one column".into());
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                return Err("column names must not be empty".into());
            }
            if column.name.contains(':') {
                return Err(format!("column name '{}' must not be qualified", column.name));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(format!("duplicate column '{}'", column.name));
            }
        }

        Ok(())
    }

    /// Same schema with every legacy identifier column reported as `int_8s`.
    pub fn modernized(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    column_type: c.column_type.modernized(),
                    nullable: c.nullable,
                })
                .collect(),
        )
    }

    /// Keeps the named columns, in the given order.
    pub fn project(&self, names: &[&str]) -> Option<Schema> {
        names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<Option<Vec<_>>>()
            .map(Schema::new)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", column)?;
        }
        f.write_str(")")
    }
}

impl FromIterator<Column> for Schema {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Schema::new(iter.into_iter().collect())
    }
}
