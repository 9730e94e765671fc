//! LIGO_LW document parser
//!
//! Walks the XML event stream once, building each `Table` as its `Column`
//! and `Stream` children arrive:
//!
//! - Registered table names use the registry schema; inline columns must be
//!   compatible with it
//! - Unregistered tables use their inline columns verbatim
//! - Rows are fully coerced before they are kept; a bad row never yields a
//!   partial row
//! - Structural problems abort the parse in every mode

use std::fs;
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use crate::coerce::{coerce_text, unquote, CoercionError, Coercer, IlwdPolicy, Value};
use crate::errors::{LigolwError, LigolwResult};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{ensure_compatible, Column, ColumnType, Schema, SchemaRegistry};

use super::options::{ParseOptions, RowErrorMode, StreamFormat};
use super::stream::{split_rows, RawRow};
use super::table::{Document, Param, RejectedRow, Row, Table};

const ROOT: &str = "LIGO_LW";

/// Normalized table name: `"postcoh:table"` → `"postcoh"`.
pub fn table_name(raw: &str) -> &str {
    let name = raw.strip_suffix(":table").unwrap_or(raw);
    name.rsplit(':').next().unwrap_or(name)
}

/// Normalized column name: `"postcoh:end_time"` → `"end_time"`.
pub fn column_name(raw: &str) -> &str {
    raw.rsplit(':').next().unwrap_or(raw)
}

/// Normalized param name: `"event_id:param"` → `"event_id"`.
pub fn param_name(raw: &str) -> &str {
    let name = raw.strip_suffix(":param").unwrap_or(raw);
    name.rsplit(':').next().unwrap_or(name)
}

/// Parses LIGO_LW documents against a populated registry.
#[derive(Debug, Clone)]
pub struct DocumentParser<'r> {
    registry: &'r SchemaRegistry,
    options: ParseOptions,
}

impl<'r> DocumentParser<'r> {
    pub fn new(registry: &'r SchemaRegistry, options: ParseOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parses a file; the path is the document's origin.
    pub fn parse_file(&self, path: &Path) -> LigolwResult<Document> {
        let origin = path.display().to_string();
        let bytes = fs::read(path).map_err(|e| LigolwError::io(origin.as_str(), e))?;
        self.parse_bytes(&bytes, &origin)
    }

    pub fn parse_reader<R: Read>(&self, mut reader: R, origin: &str) -> LigolwResult<Document> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| LigolwError::io(origin, e))?;
        self.parse_bytes(&bytes, origin)
    }

    pub fn parse_bytes(&self, bytes: &[u8], origin: &str) -> LigolwResult<Document> {
        let text = std::str::from_utf8(bytes).map_err(|e| LigolwError::MalformedDocument {
            origin: origin.to_string(),
            path: String::new(),
            offset: e.valid_up_to() as u64,
            reason: "document is not valid UTF-8".into(),
        })?;
        self.parse_str(text, origin)
    }

    /// Parses a whole document held in memory.
    pub fn parse_str(&self, text: &str, origin: &str) -> LigolwResult<Document> {
        self.options.validate().map_err(LigolwError::Config)?;

        let mut walk = Walk::new(self, origin);
        let mut reader = Reader::from_str(text);

        loop {
            let event = reader.read_event().map_err(|e| LigolwError::MalformedDocument {
                origin: origin.to_string(),
                path: walk.path(),
                offset: reader.buffer_position() as u64,
                reason: e.to_string(),
            })?;
            walk.offset = reader.buffer_position() as u64;

            match event {
                XmlEvent::Start(e) => walk.open(&e, false)?,
                XmlEvent::Empty(e) => walk.open(&e, true)?,
                XmlEvent::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if walk.parent() != Some(name.as_str()) {
                        return Err(walk.malformed(format!("mismatched end tag </{}>", name)));
                    }
                    walk.close(&name)?;
                }
                XmlEvent::Text(e) => {
                    if walk.capturing() {
                        let text = e.unescape().map_err(|err| walk.malformed(err.to_string()))?;
                        walk.text.push_str(&text);
                    }
                }
                XmlEvent::CData(e) => {
                    if walk.capturing() {
                        let text = std::str::from_utf8(&e)
                            .map_err(|err| walk.malformed(format!("CDATA is not UTF-8: {}", err)))?;
                        walk.text.push_str(text);
                    }
                }
                XmlEvent::Eof => break,
                _ => {}
            }
        }

        walk.finish()
    }
}

/// A table whose columns are known and whose stream has not closed yet.
struct PendingTable {
    name: String,
    inline: Vec<Column>,
    /// Effective schema and wire columns, fixed when the stream opens
    resolved: Option<Resolved>,
    rows: Vec<Row>,
    stream_seen: bool,
}

struct Resolved {
    schema: Schema,
    /// Declared wire type with the effective nullability, per field
    wire: Vec<Column>,
    format: StreamFormat,
}

struct PendingParam {
    name: String,
    param_type: ColumnType,
}

/// Mutable state of one parse.
struct Walk<'p, 'r> {
    parser: &'p DocumentParser<'r>,
    origin: &'p str,
    stack: Vec<String>,
    offset: u64,
    root_closed: bool,
    table: Option<PendingTable>,
    param: Option<PendingParam>,
    in_stream: bool,
    text: String,
    tables: Vec<Table>,
    params: Vec<Param>,
    rejected: Vec<RejectedRow>,
}

impl<'p, 'r> Walk<'p, 'r> {
    fn new(parser: &'p DocumentParser<'r>, origin: &'p str) -> Self {
        Self {
            parser,
            origin,
            stack: Vec::new(),
            offset: 0,
            root_closed: false,
            table: None,
            param: None,
            in_stream: false,
            text: String::new(),
            tables: Vec::new(),
            params: Vec::new(),
            rejected: Vec::new(),
        }
    }

    fn path(&self) -> String {
        self.stack.join("/")
    }

    fn malformed(&self, reason: impl Into<String>) -> LigolwError {
        LigolwError::MalformedDocument {
            origin: self.origin.to_string(),
            path: self.path(),
            offset: self.offset,
            reason: reason.into(),
        }
    }

    fn capturing(&self) -> bool {
        self.in_stream || self.param.is_some()
    }

    fn parent(&self) -> Option<&str> {
        self.stack.last().map(|s| s.split('[').next().unwrap_or(s))
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> LigolwResult<()> {
        let element = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        if self.stack.is_empty() {
            if self.root_closed {
                return Err(self.malformed(format!("element <{}> after the root element", element)));
            }
            if element != ROOT {
                return Err(self.malformed(format!("root element must be <{}>, found <{}>", ROOT, element)));
            }
        }

        let mut label = element.clone();
        match element.as_str() {
            "Table" => {
                if self.table.is_some() {
                    return Err(self.malformed("nested <Table>"));
                }
                let raw = self.required_attr(e, &element, "Name")?;
                let name = table_name(&raw).to_string();
                label = format!("Table[{}]", name);
                self.table = Some(PendingTable {
                    name,
                    inline: Vec::new(),
                    resolved: None,
                    rows: Vec::new(),
                    stream_seen: false,
                });
            }
            "Column" => self.open_column(e)?,
            "Stream" => self.open_stream(e)?,
            "Param" => {
                let raw = self.required_attr(e, &element, "Name")?;
                let tag = self.required_attr(e, &element, "Type")?;
                let param_type = ColumnType::from_tag(&tag)
                    .ok_or_else(|| self.malformed(format!("unknown param type '{}'", tag)))?;
                self.param = Some(PendingParam {
                    name: param_name(&raw).to_string(),
                    param_type,
                });
                self.text.clear();
            }
            _ => {}
        }

        self.stack.push(label);
        if empty {
            self.close(&element)?;
        }
        Ok(())
    }

    fn open_column(&mut self, e: &BytesStart<'_>) -> LigolwResult<()> {
        if self.parent() != Some("Table") {
            return Err(self.malformed("<Column> outside <Table>"));
        }
        let raw = self.required_attr(e, "Column", "Name")?;
        let tag = self.required_attr(e, "Column", "Type")?;
        let column_type = ColumnType::from_tag(&tag)
            .ok_or_else(|| self.malformed(format!("unknown column type '{}'", tag)))?;

        let name = column_name(&raw).to_string();
        let (stream_seen, duplicate) = match self.table.as_ref() {
            Some(table) => (
                table.stream_seen,
                table.inline.iter().any(|c| c.name == name),
            ),
            None => return Err(self.malformed("<Column> outside <Table>")),
        };
        if stream_seen {
            return Err(self.malformed("<Column> after <Stream>"));
        }
        if duplicate {
            return Err(self.malformed(format!("duplicate column '{}'", name)));
        }

        let Some(table) = self.table.as_mut() else {
            return Ok(());
        };
        table.inline.push(Column::new(name, column_type));
        Ok(())
    }

    fn open_stream(&mut self, e: &BytesStart<'_>) -> LigolwResult<()> {
        if self.parent() != Some("Table") {
            return Err(self.malformed("<Stream> outside <Table>"));
        }
        if let Some(kind) = self.optional_attr(e, "Type")? {
            if kind != "Local" {
                return Err(self.malformed(format!("unsupported stream type '{}'", kind)));
            }
        }

        let default = &self.parser.options.format;
        let format = match self.optional_attr(e, "Delimiter")? {
            Some(delimiter) => {
                let mut chars = delimiter.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => default.with_delimiter(c),
                    _ => {
                        return Err(self.malformed(format!(
                            "delimiter must be a single character, found '{}'",
                            delimiter
                        )))
                    }
                }
            }
            None => default.clone(),
        };
        format
            .validate()
            .map_err(|reason| self.malformed(format!("invalid stream format: {}", reason)))?;

        if self.table.as_ref().is_some_and(|t| t.stream_seen) {
            return Err(self.malformed("second <Stream> in <Table>"));
        }

        let resolved = self.resolve(format)?;
        if let Some(table) = self.table.as_mut() {
            table.stream_seen = true;
            table.resolved = Some(resolved);
        }
        self.in_stream = true;
        self.text.clear();
        Ok(())
    }

    /// Fixes the effective schema of the pending table.
    fn resolve(&self, format: StreamFormat) -> LigolwResult<Resolved> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| self.malformed("no pending <Table>"))?;
        let inline = Schema::new(table.inline.clone());

        let schema = match self.parser.registry.lookup(&table.name) {
            Some(registered) => {
                ensure_compatible(&table.name, registered, &inline)
                    .map_err(|e| e.with_origin(self.origin))?;
                registered.clone()
            }
            None => inline,
        };

        let wire = table
            .inline
            .iter()
            .zip(schema.columns())
            .map(|(declared, effective)| Column {
                name: effective.name.clone(),
                column_type: declared.column_type,
                nullable: effective.nullable,
            })
            .collect();

        Ok(Resolved {
            schema,
            wire,
            format,
        })
    }

    fn close(&mut self, element: &str) -> LigolwResult<()> {
        match element {
            "Stream" => {
                self.in_stream = false;
                let text = std::mem::take(&mut self.text);
                self.read_rows(&text)?;
            }
            "Table" => {
                let format = self.parser.options.format.clone();
                let unresolved = self.table.as_ref().is_some_and(|t| t.resolved.is_none());
                if unresolved {
                    let resolved = self.resolve(format)?;
                    if let Some(table) = self.table.as_mut() {
                        table.resolved = Some(resolved);
                    }
                }
                if let Some(table) = self.table.take() {
                    self.finish_table(table);
                }
            }
            "Param" => {
                if let Some(param) = self.param.take() {
                    let text = std::mem::take(&mut self.text);
                    self.finish_param(param, &text)?;
                }
            }
            _ => {}
        }

        self.stack.pop();
        if self.stack.is_empty() {
            self.root_closed = true;
        }
        Ok(())
    }

    fn read_rows(&mut self, text: &str) -> LigolwResult<()> {
        let parser = self.parser;
        let options = &parser.options;

        let Some(table) = self.table.as_mut() else {
            return Ok(());
        };
        let Some(resolved) = table.resolved.as_ref() else {
            return Ok(());
        };
        let coercer = Coercer::new(resolved.format.quoting(), options.ilwd_policy);

        for (index, raw) in split_rows(text, &resolved.format).into_iter().enumerate() {
            let raw = raw.normalize(resolved.wire.len(), &resolved.format);
            match build_row(&coercer, self.origin, &table.name, index, &resolved.wire, raw) {
                Ok(row) => table.rows.push(row),
                Err(error) if error.is_row_level() && options.row_errors == RowErrorMode::Permissive => {
                    let row = index.to_string();
                    log_event_with_fields(
                        Event::RowRejected,
                        &[
                            ("origin", self.origin),
                            ("table", table.name.as_str()),
                            ("row", row.as_str()),
                            ("code", error.code()),
                        ],
                    );
                    self.rejected.push(RejectedRow {
                        table: table.name.clone(),
                        row: index,
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }

    fn finish_table(&mut self, pending: PendingTable) {
        let Some(resolved) = pending.resolved else {
            return;
        };

        let mut schema = resolved.schema;
        if self.parser.options.strip_ilwdchar {
            let converted: Vec<&str> = schema
                .columns()
                .iter()
                .zip(&resolved.wire)
                .filter(|(effective, wire)| {
                    effective.column_type == ColumnType::Ilwd || wire.column_type == ColumnType::Ilwd
                })
                .map(|(effective, _)| effective.name.as_str())
                .collect();
            if !converted.is_empty() {
                let columns = converted.join(",");
                log_event_with_fields(
                    Event::IlwdConverted,
                    &[
                        ("origin", self.origin),
                        ("table", pending.name.as_str()),
                        ("columns", columns.as_str()),
                    ],
                );
            }
            schema = schema.modernized();
        }

        let rows = pending.rows.len().to_string();
        log_event_with_fields(
            Event::TableParsed,
            &[
                ("origin", self.origin),
                ("table", pending.name.as_str()),
                ("rows", rows.as_str()),
            ],
        );
        self.tables.push(Table::from_parts(pending.name, schema, pending.rows));
    }

    fn finish_param(&mut self, pending: PendingParam, text: &str) -> LigolwResult<()> {
        let options = &self.parser.options;
        let mismatch = |value: String, reason: String| LigolwError::TypeMismatch {
            origin: self.origin.to_string(),
            table: ROOT.to_string(),
            row: 0,
            column: pending.name.clone(),
            column_type: pending.param_type,
            value,
            reason,
        };

        let field = unquote(text, options.format.quoting()).map_err(|reason| mismatch(text.to_string(), reason))?;

        let value = if field.text.is_empty() && !(field.quoted && pending.param_type.is_text()) {
            Value::Null
        } else {
            coerce_text(&field.text, pending.param_type, None, IlwdPolicy::SuffixOnly).map_err(|e| match e {
                CoercionError::Mismatch { value, reason } => mismatch(value, reason),
                CoercionError::Null => mismatch(field.text.clone(), e.to_string()),
            })?
        };

        let mut param_type = pending.param_type;
        if options.strip_ilwdchar && param_type == ColumnType::Ilwd {
            param_type = param_type.modernized();
            log_event_with_fields(
                Event::IlwdConverted,
                &[("origin", self.origin), ("param", pending.name.as_str())],
            );
        }

        self.params.push(Param {
            name: pending.name,
            param_type,
            value,
        });
        Ok(())
    }

    fn finish(self) -> LigolwResult<Document> {
        if let Some(open) = self.stack.last() {
            return Err(self.malformed(format!("unterminated element <{}>", open)));
        }
        if !self.root_closed {
            return Err(self.malformed(format!("document has no <{}> root element", ROOT)));
        }
        Ok(Document::new(
            self.origin.to_string(),
            self.tables,
            self.params,
            self.rejected,
        ))
    }

    fn optional_attr(&self, e: &BytesStart<'_>, key: &str) -> LigolwResult<Option<String>> {
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.malformed(err.to_string()))?;
            if attr.key.as_ref() == key.as_bytes() {
                let value = attr
                    .unescape_value()
                    .map_err(|err| self.malformed(err.to_string()))?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }

    fn required_attr(&self, e: &BytesStart<'_>, element: &str, key: &str) -> LigolwResult<String> {
        self.optional_attr(e, key)?
            .ok_or_else(|| self.malformed(format!("<{}> is missing required attribute '{}'", element, key)))
    }
}

/// Coerces every field of one raw row, or fails without a partial row.
fn build_row(
    coercer: &Coercer,
    origin: &str,
    table: &str,
    index: usize,
    wire: &[Column],
    raw: RawRow<'_>,
) -> LigolwResult<Row> {
    if raw.fields.len() != wire.len() {
        return Err(LigolwError::RowArity {
            origin: origin.to_string(),
            table: table.to_string(),
            row: index,
            expected: wire.len(),
            found: raw.fields.len(),
        });
    }

    let values = raw
        .fields
        .iter()
        .zip(wire)
        .map(|(field, column)| {
            coercer
                .coerce(field, table, column)
                .map_err(|e| match e {
                    CoercionError::Null => LigolwError::NullConstraint {
                        origin: origin.to_string(),
                        table: table.to_string(),
                        row: index,
                        column: column.name.clone(),
                    },
                    CoercionError::Mismatch { value, reason } => LigolwError::TypeMismatch {
                        origin: origin.to_string(),
                        table: table.to_string(),
                        row: index,
                        column: column.name.clone(),
                        column_type: column.column_type,
                        value,
                        reason,
                    },
                })
        })
        .collect::<LigolwResult<Vec<_>>>()?;

    Ok(Row::new(values))
}
