//! Multi-file table merge
//!
//! Sources are parsed (sequentially or on a rayon pool) and their copies of
//! one table concatenated in source order. The first providing source fixes
//! the schema; every later copy must be compatible with it. A failed load
//! never returns a partial table, and with parallel parsing the error
//! reported is still the first one in source order.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::document::{DocumentParser, RejectedRow, Table};
use crate::errors::{LigolwError, LigolwResult};
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::schema::{ensure_compatible, SchemaRegistry};

use super::options::{LoadOptions, MissingTablePolicy, Parallelism};
use super::source::Source;

/// Outcome of a successful load.
#[derive(Debug)]
pub struct LoadReport {
    pub table: Table,
    /// Sources that provided the table, in order
    pub sources_loaded: Vec<String>,
    /// Sources skipped for lacking the table
    pub sources_skipped: Vec<String>,
    /// Rows skipped in permissive mode, in source order
    pub rejected_rows: Vec<RejectedRow>,
}

/// One source's contribution before merging.
struct Extracted {
    origin: String,
    table: Option<Table>,
    rejected: Vec<RejectedRow>,
}

/// Loads and merges one table across many documents.
#[derive(Debug, Clone)]
pub struct TableLoader<'r> {
    registry: &'r SchemaRegistry,
    options: LoadOptions,
}

impl<'r> TableLoader<'r> {
    pub fn new(registry: &'r SchemaRegistry, options: LoadOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Merged table only.
    pub fn load_table(&self, sources: &[Source], table: &str) -> LigolwResult<Table> {
        self.load_report(sources, table).map(|report| report.table)
    }

    /// Merged table plus per-source bookkeeping.
    pub fn load_report(&self, sources: &[Source], table: &str) -> LigolwResult<LoadReport> {
        let count = sources.len().to_string();
        let scope = ObservationScope::with_fields("LOAD", &[("table", table), ("sources", count.as_str())]);

        match self.run(sources, table) {
            Ok(report) => {
                let rows = report.table.len().to_string();
                let skipped = report.sources_skipped.len().to_string();
                let rejected = report.rejected_rows.len().to_string();
                scope.complete_with_fields(&[
                    ("rows", rows.as_str()),
                    ("skipped", skipped.as_str()),
                    ("rejected", rejected.as_str()),
                ]);
                Ok(report)
            }
            Err(error) => {
                scope.fail(error.code(), &error.to_string());
                Err(error)
            }
        }
    }

    fn run(&self, sources: &[Source], table: &str) -> LigolwResult<LoadReport> {
        self.options.validate().map_err(LigolwError::Config)?;

        match self.options.parallelism {
            Parallelism::Sequential => {
                self.merge(sources, table, sources.iter().map(|s| self.extract(s, table)))
            }
            Parallelism::Parallel { workers } => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("ligolw-load-{}", i))
                    .build()
                    .map_err(|e| LigolwError::Config(format!("cannot start worker pool: {}", e)))?;

                let extracted: Vec<LigolwResult<Extracted>> =
                    pool.install(|| sources.par_iter().map(|s| self.extract(s, table)).collect());

                self.merge(sources, table, extracted.into_iter())
            }
        }
    }

    /// Parses one source and moves out its copy of `table`.
    fn extract(&self, source: &Source, table: &str) -> LigolwResult<Extracted> {
        let parser = DocumentParser::new(self.registry, self.options.parse.clone());
        let origin = source.name();

        let parsed = match source {
            Source::Path(path) => parser.parse_file(path),
            Source::Bytes { data, .. } => parser.parse_bytes(data, &origin),
        };
        let mut document = parsed.map_err(|e| {
            log_event_with_fields(
                Event::SourceFailed,
                &[("origin", origin.as_str()), ("code", e.code())],
            );
            e
        })?;

        Ok(Extracted {
            table: document.take_table(table)?,
            rejected: document.take_rejected(table),
            origin,
        })
    }

    /// Concatenates extracted tables in source order.
    fn merge<I>(&self, sources: &[Source], name: &str, extracted: I) -> LigolwResult<LoadReport>
    where
        I: Iterator<Item = LigolwResult<Extracted>>,
    {
        let mut merged: Option<Table> = None;
        let mut sources_loaded = Vec::new();
        let mut sources_skipped = Vec::new();
        let mut rejected_rows = Vec::new();

        for result in extracted {
            let Extracted {
                origin,
                table,
                rejected,
            } = result?;
            rejected_rows.extend(rejected);

            let Some(table) = table else {
                if self.options.missing_table == MissingTablePolicy::Error {
                    return Err(LigolwError::MissingTable {
                        origin,
                        table: name.to_string(),
                    });
                }
                log_event_with_fields(
                    Event::SourceSkipped,
                    &[("origin", origin.as_str()), ("table", name)],
                );
                sources_skipped.push(origin);
                continue;
            };

            let rows = table.len().to_string();
            match merged.as_mut() {
                None => merged = Some(table),
                Some(target) => {
                    ensure_compatible(name, target.schema(), table.schema())
                        .map_err(|e| e.with_origin(&origin))?;
                    target.extend_rows(table.into_rows());
                }
            }
            log_event_with_fields(
                Event::SourceLoaded,
                &[("origin", origin.as_str()), ("table", name), ("rows", rows.as_str())],
            );
            sources_loaded.push(origin);
        }

        let table = match merged {
            Some(table) => table,
            None => self.empty_table(sources, name)?,
        };
        let table = match &self.options.columns {
            Some(columns) => {
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                table.select(&columns)?
            }
            None => table,
        };

        Ok(LoadReport {
            table,
            sources_loaded,
            sources_skipped,
            rejected_rows,
        })
    }

    /// No source held the table: a registered table is empty, anything else
    /// is missing.
    fn empty_table(&self, sources: &[Source], name: &str) -> LigolwResult<Table> {
        match self.registry.lookup(name) {
            Some(schema) => {
                let schema = if self.options.parse.strip_ilwdchar {
                    schema.modernized()
                } else {
                    schema.clone()
                };
                Ok(Table::new(name, schema))
            }
            None => {
                let origin = if sources.is_empty() {
                    "<no sources>".to_string()
                } else {
                    sources.iter().map(Source::name).collect::<Vec<_>>().join(", ")
                };
                Err(LigolwError::MissingTable {
                    origin,
                    table: name.to_string(),
                })
            }
        }
    }
}

/// Loads `table` from `sources` with the given options.
pub fn load_table(
    registry: &SchemaRegistry,
    sources: &[Source],
    table: &str,
    options: LoadOptions,
) -> LigolwResult<Table> {
    TableLoader::new(registry, options).load_table(sources, table)
}
