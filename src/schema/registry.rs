//! Schema registry for custom table types
//!
//! - Table name → schema bindings, populated before any parse
//! - Re-registering an identical schema is a no-op
//! - Re-registering a different schema is a conflict
//! - Definitions can be loaded from / saved to `<dir>/<table>.json`
//!
//! `register` takes `&mut self` and every parse takes `&SchemaRegistry`, so
//! registration cannot interleave with (parallel) parsing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{LigolwError, LigolwResult};
use crate::observability::{log_event_with_fields, Event};

use super::types::{Column, Schema};

/// On-disk form of a registration
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaDefinition {
    table: String,
    columns: Vec<Column>,
}

/// Catalog of custom table schemas, passed explicitly to the parser.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Registered schemas indexed by normalized table name
    schemas: BTreeMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `schema`.
    ///
    /// # Errors
    ///
    /// - `InvalidSchema` if the schema is empty or has duplicate columns
    /// - `SchemaConflict` if `name` is already bound to a different schema
    pub fn register(&mut self, name: impl Into<String>, schema: Schema) -> LigolwResult<()> {
        let name = name.into();
        if name.is_empty() || name.contains(':') {
            return Err(LigolwError::InvalidSchema {
                origin: format!("registration of '{}'", name),
                reason: "table names must be non-empty and unqualified".into(),
            });
        }
        schema.validate().map_err(|reason| LigolwError::InvalidSchema {
            origin: format!("registration of '{}'", name),
            reason,
        })?;

        if let Some(existing) = self.schemas.get(&name) {
            if *existing == schema {
                return Ok(());
            }
            return Err(LigolwError::SchemaConflict {
                origin: None,
                table: name,
                expected: existing.to_string(),
                found: schema.to_string(),
                reason: "table is already registered with a different schema".into(),
            });
        }

        let columns = schema.len().to_string();
        log_event_with_fields(
            Event::SchemaRegistered,
            &[("table", name.as_str()), ("columns", columns.as_str())],
        );
        self.schemas.insert(name, schema);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered table names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registers every `*.json` definition in `dir`, in file name order.
    ///
    /// Other files are skipped. A missing directory is an error.
    pub fn load_dir(&mut self, dir: &Path) -> LigolwResult<usize> {
        let origin = dir.display().to_string();
        let entries = fs::read_dir(dir).map_err(|e| LigolwError::io(origin.as_str(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| LigolwError::io(origin.as_str(), e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }

        log_event_with_fields(
            Event::SchemasLoaded,
            &[("dir", origin.as_str()), ("files", paths.len().to_string().as_str())],
        );
        Ok(paths.len())
    }

    /// Registers the definition stored in a single JSON file.
    pub fn load_file(&mut self, path: &Path) -> LigolwResult<()> {
        let origin = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| LigolwError::io(origin.as_str(), e))?;

        let definition: SchemaDefinition =
            serde_json::from_str(&content).map_err(|e| LigolwError::InvalidSchema {
                origin: origin.clone(),
                reason: format!("invalid JSON: {}", e),
            })?;

        self.register(definition.table, Schema::new(definition.columns))
            .map_err(|e| e.with_origin(&origin))
    }

    /// Writes the registration for `name` to `<dir>/<name>.json`.
    pub fn save(&self, dir: &Path, name: &str) -> LigolwResult<PathBuf> {
        let schema = self.lookup(name).ok_or_else(|| LigolwError::InvalidSchema {
            origin: dir.display().to_string(),
            reason: format!("table '{}' is not registered", name),
        })?;

        let definition = SchemaDefinition {
            table: name.to_string(),
            columns: schema.columns().to_vec(),
        };

        let path = dir.join(format!("{}.json", name));
        let origin = path.display().to_string();
        let content =
            serde_json::to_string_pretty(&definition).map_err(|e| LigolwError::InvalidSchema {
                origin: origin.clone(),
                reason: format!("failed to serialize schema: {}", e),
            })?;

        fs::create_dir_all(dir).map_err(|e| LigolwError::io(dir.display().to_string(), e))?;
        fs::write(&path, content).map_err(|e| LigolwError::io(origin, e))?;

        Ok(path)
    }
}
