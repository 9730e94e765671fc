//! spiir-ligolw - custom tables and multi-file merging for LIGO_LW XML
//!
//! LIGO Light Weight XML documents hold named tables of typed columns. This
//! crate lets callers register schemas for non-standard tables (such as the
//! SPIIR `postcoh` trigger table), parse documents against those schemas, and
//! merge one table across many documents into a single in-memory table.
//!
//! ```ignore
//! use spiir_ligolw::{load_table, register_postcoh, LoadOptions, SchemaRegistry, Source};
//!
//! let mut registry = SchemaRegistry::new();
//! register_postcoh(&mut registry)?;
//!
//! let sources: Vec<Source> = paths.into_iter().map(Source::from).collect();
//! let table = load_table(&registry, &sources, "postcoh", LoadOptions::default())?;
//! ```
//!
//! Modules, leaves first:
//! - `coerce`: wire text ↔ native values, legacy `ilwd:char` identifiers
//! - `schema`: column types, schemas, the registry, compatibility
//! - `document`: parser, in-memory tables, writer
//! - `loader`: multi-file merge
//! - `postcoh`: the SPIIR postcoh table
//! - `observability`: structured logging
//! - `cli`: the `spiir-ligolw` command

pub mod cli;
pub mod coerce;
pub mod document;
pub mod errors;
pub mod loader;
pub mod observability;
pub mod postcoh;
pub mod schema;

pub use coerce::{IlwdPolicy, Value};
pub use document::{
    Document, DocumentParser, DocumentWriter, Param, ParseOptions, RejectedRow, Row, RowErrorMode,
    StreamFormat, Table,
};
pub use errors::{LigolwError, LigolwResult};
pub use loader::{load_table, LoadOptions, LoadReport, MissingTablePolicy, Parallelism, Source, TableLoader};
pub use postcoh::{register_postcoh, GpsTime, POSTCOH_TABLE};
pub use schema::{Column, ColumnType, Schema, SchemaRegistry};
