//! In-memory tables and documents

use serde::Serialize;

use crate::coerce::Value;
use crate::errors::{LigolwError, LigolwResult};
use crate::schema::{ColumnType, Schema};

/// One row, positionally aligned with its table's schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// A row with every column set to its type's fill value.
    pub fn defaults(schema: &Schema) -> Self {
        Self::new(
            schema
                .columns()
                .iter()
                .map(|c| c.column_type.default_value())
                .collect(),
        )
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A named, schema-typed, ordered collection of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    name: String,
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
        }
    }

    /// Builds a table, checking every row against the schema.
    pub fn from_rows(name: impl Into<String>, schema: Schema, rows: Vec<Row>) -> LigolwResult<Self> {
        let mut table = Self::new(name, schema);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Rows already coerced against `schema`.
    pub(crate) fn from_parts(name: String, schema: Schema, rows: Vec<Row>) -> Self {
        Self { name, schema, rows }
    }

    /// Appends a row after checking arity, native kinds and nullability.
    pub fn push_row(&mut self, row: Row) -> LigolwResult<()> {
        let index = self.rows.len();
        if row.len() != self.schema.len() {
            return Err(LigolwError::RowArity {
                origin: "<memory>".into(),
                table: self.name.clone(),
                row: index,
                expected: self.schema.len(),
                found: row.len(),
            });
        }

        for (column, value) in self.schema.columns().iter().zip(row.values()) {
            if value.is_null() {
                if !column.nullable {
                    return Err(LigolwError::NullConstraint {
                        origin: "<memory>".into(),
                        table: self.name.clone(),
                        row: index,
                        column: column.name.clone(),
                    });
                }
                continue;
            }
            if value.kind() != Some(column.column_type.native_kind()) {
                return Err(LigolwError::TypeMismatch {
                    origin: "<memory>".into(),
                    table: self.name.clone(),
                    row: index,
                    column: column.name.clone(),
                    column_type: column.column_type,
                    value: value.to_string(),
                    reason: format!("expected a {:?} value", column.column_type.native_kind()),
                });
            }
        }

        self.rows.push(row);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Value at (`row`, `column`)
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.schema.index_of(column)?;
        self.rows.get(row)?.get(index)
    }

    /// All values of one column, in row order.
    pub fn column_values<'t>(&'t self, column: &str) -> Option<impl Iterator<Item = &'t Value> + 't> {
        let index = self.schema.index_of(column)?;
        Some(self.rows.iter().map(move |row| &row.values[index]))
    }

    /// Projects onto `columns`, in the given order.
    pub fn select(&self, columns: &[&str]) -> LigolwResult<Table> {
        let indices = columns
            .iter()
            .map(|name| {
                self.schema
                    .index_of(name)
                    .ok_or_else(|| LigolwError::UnknownColumn {
                        table: self.name.clone(),
                        column: name.to_string(),
                    })
            })
            .collect::<LigolwResult<Vec<_>>>()?;

        let schema = Schema::new(
            indices
                .iter()
                .map(|&i| self.schema.columns()[i].clone())
                .collect(),
        );
        let rows = self
            .rows
            .iter()
            .map(|row| Row::new(indices.iter().map(|&i| row.values[i].clone()).collect()))
            .collect();

        Ok(Table::from_parts(self.name.clone(), schema, rows))
    }

    /// Replaces absent values with each column type's fill value.
    pub fn fill_nulls(self) -> Table {
        let defaults: Vec<Value> = self
            .schema
            .columns()
            .iter()
            .map(|c| c.column_type.default_value())
            .collect();

        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                Row::new(
                    row.values
                        .into_iter()
                        .zip(&defaults)
                        .map(|(v, d)| if v.is_null() { d.clone() } else { v })
                        .collect(),
                )
            })
            .collect();

        Table::from_parts(self.name, self.schema, rows)
    }

    /// Moves `rows` to the end of the table; the caller guarantees they
    /// match a compatible schema.
    pub(crate) fn extend_rows(&mut self, rows: Vec<Row>) {
        self.rows.extend(rows);
    }
}

/// A scalar stored directly in a document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ColumnType,
    pub value: Value,
}

/// A row skipped in permissive mode, with the reason.
#[derive(Debug)]
pub struct RejectedRow {
    pub table: String,
    /// Index among the table stream's non-blank rows
    pub row: usize,
    pub error: LigolwError,
}

/// Everything parsed from one source.
#[derive(Debug)]
pub struct Document {
    origin: String,
    tables: Vec<Table>,
    params: Vec<Param>,
    rejected: Vec<RejectedRow>,
}

impl Document {
    pub(crate) fn new(
        origin: String,
        tables: Vec<Table>,
        params: Vec<Param>,
        rejected: Vec<RejectedRow>,
    ) -> Self {
        Self {
            origin,
            tables,
            params,
            rejected,
        }
    }

    /// Source identifier the document was parsed from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn rejected_rows(&self) -> &[RejectedRow] {
        &self.rejected
    }

    /// First table named `name`
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Removes and returns the table named `name`.
    ///
    /// # Errors
    ///
    /// `MalformedDocument` if the document holds more than one such table.
    pub fn take_table(&mut self, name: &str) -> LigolwResult<Option<Table>> {
        let count = self.tables.iter().filter(|t| t.name == name).count();
        if count > 1 {
            return Err(LigolwError::MalformedDocument {
                origin: self.origin.clone(),
                path: format!("LIGO_LW/Table[{}]", name),
                offset: 0,
                reason: format!("table '{}' appears {} times", name, count),
            });
        }

        Ok(self
            .tables
            .iter()
            .position(|t| t.name == name)
            .map(|i| self.tables.remove(i)))
    }

    /// Moves out the rejected rows belonging to `table`.
    pub fn take_rejected(&mut self, table: &str) -> Vec<RejectedRow> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.rejected)
            .into_iter()
            .partition(|r| r.table == table);
        self.rejected = kept;
        taken
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}
