//! Multi-File Merge Invariant Tests
//!
//! - Rows are concatenated in source order, then in-source order
//! - Row count equals the sum of per-source row counts
//! - Schema drift between sources aborts the load, naming the source
//! - Parallel loading produces exactly the sequential result
//! - Failures are deterministic: the first failing source in order is reported

use std::path::PathBuf;

use spiir_ligolw::{
    load_table, LigolwError, LoadOptions, MissingTablePolicy, Parallelism, ParseOptions, RowErrorMode,
    SchemaRegistry, Source, Table, TableLoader, Value,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn fixture(name: &str) -> Source {
    Source::from(PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures")).join(name))
}

fn event_ids(table: &Table) -> Vec<i64> {
    table
        .column_values("event_id")
        .unwrap()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

fn parallel(workers: usize) -> LoadOptions {
    LoadOptions {
        parallelism: Parallelism::Parallel { workers },
        ..LoadOptions::default()
    }
}

const BAD_ROW: &str = r#"<LIGO_LW>
	<Table Name="postcoh:table">
		<Column Name="postcoh:event_id" Type="int_8s"/>
		<Column Name="postcoh:end_time" Type="int_4s"/>
		<Column Name="postcoh:end_time_ns" Type="int_4s"/>
		<Column Name="postcoh:ifos" Type="lstring"/>
		<Column Name="postcoh:cohsnr" Type="real_4"/>
		<Column Name="postcoh:far" Type="real_4"/>
		<Stream Name="postcoh:table" Type="Local" Delimiter=",">
			20,1187009200,0,"H1",8.0,1e-3,
			21,not_a_time,0,"H1",8.0,1e-3,
			22,1187009202,0,"L1",9.0,1e-4
		</Stream>
	</Table>
</LIGO_LW>"#;

// =============================================================================
// Ordering Tests
// =============================================================================

/// 3 rows from A then 5 rows from B, in that order.
#[test]
fn test_merge_preserves_source_and_row_order() {
    let registry = SchemaRegistry::new();
    let sources = vec![fixture("postcoh_a.xml"), fixture("postcoh_b.xml")];

    let table = load_table(&registry, &sources, "postcoh", LoadOptions::default()).unwrap();
    assert_eq!(table.len(), 8);
    assert_eq!(event_ids(&table), vec![0, 1, 2, 3, 4, 5, 6, 7]);
}

/// Reversing the sources reverses the blocks, never the rows within one.
#[test]
fn test_merge_order_follows_caller() {
    let registry = SchemaRegistry::new();
    let sources = vec![fixture("postcoh_b.xml"), fixture("postcoh_a.xml")];

    let table = load_table(&registry, &sources, "postcoh", LoadOptions::default()).unwrap();
    assert_eq!(event_ids(&table), vec![3, 4, 5, 6, 7, 0, 1, 2]);
}

/// Legacy and modern identifier columns merge into one int_8s column.
#[test]
fn test_merge_mixed_identifier_encodings() {
    let registry = SchemaRegistry::new();
    let sources = vec![fixture("postcoh_a.xml"), fixture("postcoh_b.xml")];

    let table = load_table(&registry, &sources, "postcoh", LoadOptions::default()).unwrap();
    let column = table.schema().column("event_id").unwrap();
    assert_eq!(column.column_type.tag(), "int_8s");
    assert_eq!(table.get(2, "cohsnr"), Some(&Value::Null));
    assert_eq!(table.get(6, "cohsnr"), Some(&Value::Real4(15.0)));
}

// =============================================================================
// Schema Drift Tests
// =============================================================================

/// A drifted source fails the whole load and is named in the error.
#[test]
fn test_drifted_source_is_named() {
    let registry = SchemaRegistry::new();
    let sources = vec![fixture("postcoh_a.xml"), fixture("postcoh_c_drift.xml")];

    let err = load_table(&registry, &sources, "postcoh", LoadOptions::default()).unwrap_err();
    match err {
        LigolwError::SchemaConflict { origin, table, .. } => {
            assert!(origin.unwrap().ends_with("postcoh_c_drift.xml"));
            assert_eq!(table, "postcoh");
        }
        other => panic!("expected schema conflict, got {}", other),
    }
}

/// The first providing source is the reference, whichever it is.
#[test]
fn test_first_source_is_reference() {
    let registry = SchemaRegistry::new();
    let sources = vec![fixture("postcoh_c_drift.xml"), fixture("postcoh_b.xml")];

    let err = load_table(&registry, &sources, "postcoh", LoadOptions::default()).unwrap_err();
    assert_eq!(err.code(), "LIGOLW_SCHEMA_CONFLICT");
    assert!(err.origin().unwrap().ends_with("postcoh_b.xml"));
}

// =============================================================================
// Missing Table Tests
// =============================================================================

#[test]
fn test_missing_table_fails_by_default() {
    let registry = SchemaRegistry::new();
    let sources = vec![fixture("postcoh_a.xml"), fixture("no_postcoh.xml")];

    let err = load_table(&registry, &sources, "postcoh", LoadOptions::default()).unwrap_err();
    assert_eq!(err.code(), "LIGOLW_MISSING_TABLE");
    assert!(err.origin().unwrap().ends_with("no_postcoh.xml"));
}

#[test]
fn test_missing_table_skipped_when_asked() {
    let registry = SchemaRegistry::new();
    let sources = vec![
        fixture("postcoh_a.xml"),
        fixture("no_postcoh.xml"),
        fixture("postcoh_b.xml"),
    ];
    let options = LoadOptions {
        missing_table: MissingTablePolicy::Skip,
        ..LoadOptions::default()
    };

    let report = TableLoader::new(&registry, options).load_report(&sources, "postcoh").unwrap();
    assert_eq!(report.table.len(), 8);
    assert_eq!(report.sources_loaded.len(), 2);
    assert_eq!(report.sources_skipped.len(), 1);
    assert!(report.sources_skipped[0].ends_with("no_postcoh.xml"));
}

// =============================================================================
// Parallel Determinism Tests
// =============================================================================

/// Parallel loading of [A, B] equals sequential loading, for any pool size.
#[test]
fn test_parallel_equals_sequential() {
    let registry = SchemaRegistry::new();
    let sources = vec![
        fixture("postcoh_a.xml"),
        fixture("postcoh_b.xml"),
        fixture("postcoh_a.xml"),
        fixture("postcoh_b.xml"),
    ];

    let sequential = load_table(&registry, &sources, "postcoh", LoadOptions::default()).unwrap();
    for workers in [1, 2, 4, 8] {
        let table = load_table(&registry, &sources, "postcoh", parallel(workers)).unwrap();
        assert_eq!(table, sequential);
    }
}

/// Parallel loading of [A, B, C] fails exactly as sequential loading does.
#[test]
fn test_parallel_failure_equals_sequential() {
    let registry = SchemaRegistry::new();
    let sources = vec![
        fixture("postcoh_a.xml"),
        fixture("postcoh_b.xml"),
        fixture("postcoh_c_drift.xml"),
    ];

    let sequential = load_table(&registry, &sources, "postcoh", LoadOptions::default()).unwrap_err();
    for _ in 0..10 {
        let err = load_table(&registry, &sources, "postcoh", parallel(3)).unwrap_err();
        assert_eq!(err.to_string(), sequential.to_string());
    }
}

/// With two failing sources, the earlier one is always reported.
#[test]
fn test_first_error_in_source_order() {
    let registry = SchemaRegistry::new();
    let sources = vec![
        fixture("postcoh_a.xml"),
        Source::bytes("broken.xml", "<LIGO_LW><Table>"),
        Source::bytes("bad_row.xml", BAD_ROW),
    ];

    for options in [LoadOptions::default(), parallel(3)] {
        let err = load_table(&registry, &sources, "postcoh", options).unwrap_err();
        assert_eq!(err.code(), "LIGOLW_MALFORMED_DOCUMENT");
        assert_eq!(err.origin(), Some("broken.xml"));
    }
}

// =============================================================================
// Row Error Tests
// =============================================================================

/// Fail-fast: one bad row aborts the load and no partial table is returned.
#[test]
fn test_bad_row_aborts_load() {
    let registry = SchemaRegistry::new();
    let sources = vec![fixture("postcoh_a.xml"), Source::bytes("bad_row.xml", BAD_ROW)];

    let err = load_table(&registry, &sources, "postcoh", LoadOptions::default()).unwrap_err();
    match err {
        LigolwError::TypeMismatch { origin, row, column, .. } => {
            assert_eq!(origin, "bad_row.xml");
            assert_eq!(row, 1);
            assert_eq!(column, "end_time");
        }
        other => panic!("expected type mismatch, got {}", other),
    }
}

/// Permissive: the bad row is skipped and reported, its neighbours kept.
#[test]
fn test_permissive_reports_rejected_rows() {
    let registry = SchemaRegistry::new();
    let sources = vec![fixture("postcoh_a.xml"), Source::bytes("bad_row.xml", BAD_ROW)];
    let options = LoadOptions {
        parse: ParseOptions {
            row_errors: RowErrorMode::Permissive,
            ..ParseOptions::default()
        },
        ..LoadOptions::default()
    };

    let report = TableLoader::new(&registry, options).load_report(&sources, "postcoh").unwrap();
    assert_eq!(event_ids(&report.table), vec![0, 1, 2, 20, 22]);
    assert_eq!(report.rejected_rows.len(), 1);
    assert_eq!(report.rejected_rows[0].row, 1);
    assert_eq!(report.rejected_rows[0].error.code(), "LIGOLW_TYPE_MISMATCH");
}
