//! LIGO_LW documents: parsing, in-memory tables, writing
//!
//! A document is an XML tree rooted at `LIGO_LW`. Each `Table` element
//! declares its columns, then carries its rows as delimited text in a single
//! `Stream` element. Registered tables are validated against the registry;
//! all others are taken as declared.

mod options;
mod parser;
mod stream;
mod table;
mod writer;

pub use options::{ParseOptions, RowErrorMode, StreamFormat};
pub use parser::{column_name, param_name, table_name, DocumentParser};
pub use stream::{split_rows, RawRow};
pub use table::{Document, Param, RejectedRow, Row, Table};
pub use writer::{table_to_string, DocumentWriter};

use std::path::Path;

use crate::errors::LigolwResult;
use crate::schema::SchemaRegistry;

/// Parses a file with default options.
pub fn parse_file(registry: &SchemaRegistry, path: &Path) -> LigolwResult<Document> {
    DocumentParser::new(registry, ParseOptions::default()).parse_file(path)
}

/// Parses in-memory text with default options.
pub fn parse_str(registry: &SchemaRegistry, text: &str, origin: &str) -> LigolwResult<Document> {
    DocumentParser::new(registry, ParseOptions::default()).parse_str(text, origin)
}
