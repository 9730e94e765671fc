//! Error taxonomy for LIGO_LW parsing and merging
//!
//! Error codes:
//! - LIGOLW_MALFORMED_DOCUMENT (structural XML problem)
//! - LIGOLW_ROW_ARITY (field count does not match the schema)
//! - LIGOLW_TYPE_MISMATCH (value does not fit the declared column type)
//! - LIGOLW_NULL_CONSTRAINT (empty value in a non-nullable column)
//! - LIGOLW_SCHEMA_CONFLICT (registry, inline or cross-file schema disagreement)
//! - LIGOLW_MISSING_TABLE (requested table absent from a source)
//! - LIGOLW_UNKNOWN_COLUMN (projection names a column the table lacks)
//! - LIGOLW_INVALID_SCHEMA (schema definition rejected)
//! - LIGOLW_IO (source could not be read)
//! - LIGOLW_CONFIG (invalid parse/load configuration)

use std::io;

use thiserror::Error;

use crate::schema::ColumnType;

/// Result type for parse and merge operations
pub type LigolwResult<T> = Result<T, LigolwError>;

/// All failures raised by the parser, registry and loader.
///
/// Every variant carries enough context (source, table, row, column) to
/// locate the fault without re-parsing.
#[derive(Debug, Error)]
pub enum LigolwError {
    #[error("{origin}: malformed document at {path} (byte {offset}): {reason}")]
    MalformedDocument {
        origin: String,
        path: String,
        offset: u64,
        reason: String,
    },

    #[error("{origin}: table '{table}' row {row}: expected {expected} fields, found {found}")]
    RowArity {
        origin: String,
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error(
        "{origin}: table '{table}' row {row} column '{column}': \
         '{value}' is not a valid {column_type}: {reason}"
    )]
    TypeMismatch {
        origin: String,
        table: String,
        row: usize,
        column: String,
        column_type: ColumnType,
        value: String,
        reason: String,
    },

    #[error("{origin}: table '{table}' row {row} column '{column}': empty value in non-nullable column")]
    NullConstraint {
        origin: String,
        table: String,
        row: usize,
        column: String,
    },

    #[error("{}table '{table}': schema conflict: {reason} (expected {expected}, found {found})", origin_prefix(.origin))]
    SchemaConflict {
        origin: Option<String>,
        table: String,
        expected: String,
        found: String,
        reason: String,
    },

    #[error("{origin}: table '{table}' not found")]
    MissingTable { origin: String, table: String },

    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("{origin}: invalid schema: {reason}")]
    InvalidSchema { origin: String, reason: String },

    #[error("{origin}: I/O error: {error}")]
    Io {
        origin: String,
        #[source]
        error: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

fn origin_prefix(origin: &Option<String>) -> String {
    match origin {
        Some(origin) => format!("{}: ", origin),
        None => String::new(),
    }
}

impl LigolwError {
    /// Returns the stable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            LigolwError::MalformedDocument { .. } => "LIGOLW_MALFORMED_DOCUMENT",
            LigolwError::RowArity { .. } => "LIGOLW_ROW_ARITY",
            LigolwError::TypeMismatch { .. } => "LIGOLW_TYPE_MISMATCH",
            LigolwError::NullConstraint { .. } => "LIGOLW_NULL_CONSTRAINT",
            LigolwError::SchemaConflict { .. } => "LIGOLW_SCHEMA_CONFLICT",
            LigolwError::MissingTable { .. } => "LIGOLW_MISSING_TABLE",
            LigolwError::UnknownColumn { .. } => "LIGOLW_UNKNOWN_COLUMN",
            LigolwError::InvalidSchema { .. } => "LIGOLW_INVALID_SCHEMA",
            LigolwError::Io { .. } => "LIGOLW_IO",
            LigolwError::Config(_) => "LIGOLW_CONFIG",
        }
    }

    /// Whether the error concerns a single row and may be skipped in
    /// permissive mode.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            LigolwError::RowArity { .. }
                | LigolwError::TypeMismatch { .. }
                | LigolwError::NullConstraint { .. }
        )
    }

    /// Source identifier the error was raised for, if any
    pub fn origin(&self) -> Option<&str> {
        match self {
            LigolwError::MalformedDocument { origin, .. }
            | LigolwError::RowArity { origin, .. }
            | LigolwError::TypeMismatch { origin, .. }
            | LigolwError::NullConstraint { origin, .. }
            | LigolwError::MissingTable { origin, .. }
            | LigolwError::InvalidSchema { origin, .. }
            | LigolwError::Io { origin, .. } => Some(origin),
            LigolwError::SchemaConflict { origin, .. } => origin.as_deref(),
            LigolwError::UnknownColumn { .. } | LigolwError::Config(_) => None,
        }
    }

    /// Attaches a source identifier to a schema conflict raised without one.
    pub(crate) fn with_origin(self, source: &str) -> Self {
        match self {
            LigolwError::SchemaConflict {
                origin: None,
                table,
                expected,
                found,
                reason,
            } => LigolwError::SchemaConflict {
                origin: Some(source.to_string()),
                table,
                expected,
                found,
                reason,
            },
            other => other,
        }
    }

    pub(crate) fn io(origin: impl Into<String>, error: io::Error) -> Self {
        LigolwError::Io {
            origin: origin.into(),
            error,
        }
    }
}
