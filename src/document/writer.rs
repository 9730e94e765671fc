//! LIGO_LW document writer
//!
//! Emits the layout LIGO_LW tools produce: qualified names, one tab-indented
//! `Stream` per table, every row closed by the delimiter when
//! `trailing_delimiter` is set. Output parses back to an equivalent table.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use quick_xml::escape::{escape, partial_escape};

use crate::coerce::{encode, Owner};
use crate::errors::{LigolwError, LigolwResult};
use crate::schema::ColumnType;

use super::options::StreamFormat;
use super::table::{Document, Param, Table};

const HEADER: &str = "<?xml version='1.0' encoding='utf-8'?>\n\
<!DOCTYPE LIGO_LW SYSTEM \"http://ldas-sw.ligo.caltech.edu/doc/ligolwAPI/html/ligolw_dtd.txt\">\n";

/// Serializes tables and params to LIGO_LW XML.
#[derive(Debug, Clone, Default)]
pub struct DocumentWriter {
    format: StreamFormat,
}

impl DocumentWriter {
    pub fn new(format: StreamFormat) -> Self {
        Self { format }
    }

    /// Renders a whole document.
    pub fn render(&self, tables: &[Table], params: &[Param]) -> String {
        let mut out = String::from(HEADER);
        out.push_str("<LIGO_LW>\n");
        for param in params {
            self.render_param(&mut out, param);
        }
        for table in tables {
            self.render_table(&mut out, table);
        }
        out.push_str("</LIGO_LW>\n");
        out
    }

    pub fn render_document(&self, document: &Document) -> String {
        self.render(document.tables(), document.params())
    }

    pub fn write<W: io::Write>(&self, writer: &mut W, tables: &[Table], params: &[Param]) -> io::Result<()> {
        writer.write_all(self.render(tables, params).as_bytes())?;
        writer.flush()
    }

    pub fn write_file(&self, path: &Path, tables: &[Table], params: &[Param]) -> LigolwResult<()> {
        fs::write(path, self.render(tables, params))
            .map_err(|e| LigolwError::io(path.display().to_string(), e))
    }

    fn render_param(&self, out: &mut String, param: &Param) {
        let text = encode(&param.value, param.param_type, None, self.format.quoting());
        let _ = writeln!(
            out,
            "\t<Param Name=\"{}:param\" Type=\"{}\">{}</Param>",
            escape(param.name.as_str()),
            param.param_type.tag(),
            partial_escape(text.as_str())
        );
    }

    fn render_table(&self, out: &mut String, table: &Table) {
        let name = escape(table.name());
        let _ = writeln!(out, "\t<Table Name=\"{}:table\">", name);

        for column in table.schema().columns() {
            let _ = writeln!(
                out,
                "\t\t<Column Name=\"{}:{}\" Type=\"{}\"/>",
                name,
                escape(column.name.as_str()),
                column.column_type.tag()
            );
        }

        let delimiter = self.format.delimiter.to_string();
        let _ = writeln!(
            out,
            "\t\t<Stream Name=\"{}:table\" Type=\"Local\" Delimiter=\"{}\">",
            name,
            escape(delimiter.as_str())
        );

        let quoting = self.format.quoting();
        for row in table.rows() {
            let fields: Vec<String> = table
                .schema()
                .columns()
                .iter()
                .zip(row.values())
                .map(|(column, value)| {
                    let owner = (column.column_type == ColumnType::Ilwd).then(|| Owner {
                        table: table.name(),
                        column: &column.name,
                    });
                    encode(value, column.column_type, owner, quoting)
                })
                .collect();

            let mut line = fields.join(&delimiter);
            if self.format.trailing_delimiter {
                line.push_str(&delimiter);
            }
            out.push_str("\t\t\t");
            out.push_str(&partial_escape(line.as_str()));
            out.push(self.format.row_terminator);
        }

        out.push_str("\t\t</Stream>\n");
        out.push_str("\t</Table>\n");
    }
}

/// Renders a single table with the default stream format.
pub fn table_to_string(table: &Table) -> String {
    DocumentWriter::default().render(std::slice::from_ref(table), &[])
}
