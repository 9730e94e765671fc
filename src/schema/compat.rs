//! Schema compatibility (pure metadata).
//!
//! Two schemas are compatible iff they have the same column names in the
//! same order, and every pair of column types decodes to the same native
//! representation. Nullability is not part of compatibility.

use crate::errors::{LigolwError, LigolwResult};

use super::types::Schema;

/// Checks `found` against the reference schema `expected` for `table`.
///
/// The returned `SchemaConflict` carries no origin; callers attach the source.
pub fn ensure_compatible(table: &str, expected: &Schema, found: &Schema) -> LigolwResult<()> {
    let conflict = |reason: String| LigolwError::SchemaConflict {
        origin: None,
        table: table.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
        reason,
    };

    for (position, (want, got)) in expected.columns().iter().zip(found.columns()).enumerate() {
        if want.name != got.name {
            return Err(conflict(format!(
                "column {} is '{}', expected '{}'",
                position, got.name, want.name
            )));
        }
        if !got.column_type.is_coercible_to(want.column_type) {
            return Err(conflict(format!(
                "column '{}' has type {}, expected {}",
                got.name, got.column_type, want.column_type
            )));
        }
    }

    if expected.len() != found.len() {
        return Err(conflict(format!(
            "{} columns declared, expected {}",
            found.len(),
            expected.len()
        )));
    }

    Ok(())
}

pub fn is_compatible(expected: &Schema, found: &Schema) -> bool {
    ensure_compatible("", expected, found).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnType};

    fn reference() -> Schema {
        Schema::new(vec![
            Column::new("event_id", ColumnType::Int8s),
            Column::new("ifos", ColumnType::LString),
        ])
    }

    #[test]
    fn test_identical_schemas_compatible() {
        assert!(is_compatible(&reference(), &reference()));
    }

    #[test]
    fn test_legacy_identifier_compatible_with_int8s() {
        let legacy = Schema::new(vec![
            Column::new("event_id", ColumnType::Ilwd),
            Column::new("ifos", ColumnType::CharV),
        ]);
        assert!(is_compatible(&reference(), &legacy));
    }

    #[test]
    fn test_reordered_columns_conflict() {
        let reordered = Schema::new(vec![
            Column::new("ifos", ColumnType::LString),
            Column::new("event_id", ColumnType::Int8s),
        ]);
        let err = ensure_compatible("postcoh", &reference(), &reordered).unwrap_err();
        assert!(err.to_string().contains("column 0"));
    }

    #[test]
    fn test_extra_column_conflict() {
        let mut columns = reference().columns().to_vec();
        columns.push(Column::new("far", ColumnType::Real4));
        let err = ensure_compatible("postcoh", &reference(), &Schema::new(columns)).unwrap_err();
        assert_eq!(err.code(), "LIGOLW_SCHEMA_CONFLICT");
        assert!(err.to_string().contains("3 columns declared, expected 2"));
    }

    #[test]
    fn test_type_drift_conflict() {
        let drifted = Schema::new(vec![
            Column::new("event_id", ColumnType::Int4s),
            Column::new("ifos", ColumnType::LString),
        ]);
        assert!(!is_compatible(&reference(), &drifted));
    }
}
