//! Multi-file loader and merger
//!
//! Given an ordered list of sources and a table name, parses every source,
//! extracts the table, checks schema consistency and concatenates the rows.

mod merge;
mod options;
mod source;

pub use merge::{load_table, LoadReport, TableLoader};
pub use options::{LoadOptions, MissingTablePolicy, Parallelism};
pub use source::Source;
