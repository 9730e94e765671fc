//! CLI command implementations

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::document::{DocumentParser, DocumentWriter, RowErrorMode};
use crate::loader::{LoadOptions, LoadReport, MissingTablePolicy, Parallelism, Source, TableLoader};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::postcoh::register_postcoh;
use crate::schema::SchemaRegistry;

use super::args::{Cli, Command, CommonArgs, OutputFormat};
use super::errors::{CliError, CliResult};
use super::io::{write_json, write_text};

/// Configuration file structure
///
/// Every field is optional; command-line flags override the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum log severity: trace, info, warn or error
    pub log_level: String,

    /// Directory of JSON schema definitions
    pub schema_dir: Option<PathBuf>,

    /// Register the postcoh table schema
    pub register_postcoh: bool,

    /// Parse and merge options
    pub load: LoadOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            schema_dir: None,
            register_postcoh: false,
            load: LoadOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        let origin = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", origin.as_str())]);

        Ok(config)
    }

    /// Config file if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CliResult<()> {
        self.severity()?;
        self.load
            .validate()
            .map_err(|e| CliError::config_error(format!("Invalid load options: {}", e)))
    }

    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level.parse().map_err(CliError::config_error)
    }

    /// Applies command-line overrides.
    fn apply(&mut self, common: &CommonArgs) {
        if let Some(dir) = &common.schema_dir {
            self.schema_dir = Some(dir.clone());
        }
        if common.postcoh {
            self.register_postcoh = true;
        }
    }

    /// Builds the registry the config asks for.
    pub fn registry(&self) -> CliResult<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        if self.register_postcoh {
            register_postcoh(&mut registry)?;
        }
        if let Some(dir) = &self.schema_dir {
            registry.load_dir(dir)?;
        }
        Ok(registry)
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Tables { common, file } => {
            let config = prepare(&common)?;
            let report = tables(&config, &file)?;
            write_json(&report, None)
        }
        Command::Merge {
            common,
            table,
            workers,
            ignore_missing,
            permissive,
            columns,
            format,
            output,
            files,
        } => {
            let mut config = prepare(&common)?;
            let load = &mut config.load;
            if let Some(workers) = workers {
                load.parallelism = Parallelism::Parallel { workers };
            }
            if ignore_missing {
                load.missing_table = MissingTablePolicy::Skip;
            }
            if permissive {
                load.parse.row_errors = RowErrorMode::Permissive;
            }
            if !columns.is_empty() {
                load.columns = Some(columns);
            }
            config.validate()?;

            let rendered = merge(&config, &table, &files, format)?;
            write_text(&rendered, output.as_deref())
        }
    }
}

/// Loads the config, applies overrides and sets the log level.
fn prepare(common: &CommonArgs) -> CliResult<Config> {
    let mut config = Config::load_or_default(common.config.as_deref())?;
    config.apply(common);
    Logger::set_min_severity(config.severity()?);
    Ok(config)
}

/// Describes every table and param of one document.
pub fn tables(config: &Config, file: &Path) -> CliResult<Value> {
    let registry = config.registry()?;
    let parser = DocumentParser::new(&registry, config.load.parse.clone());
    let document = parser.parse_file(file)?;

    let tables: Vec<Value> = document
        .tables()
        .iter()
        .map(|table| {
            json!({
                "name": table.name(),
                "registered": registry.contains(table.name()),
                "rows": table.len(),
                "columns": table.schema(),
            })
        })
        .collect();

    Ok(json!({
        "origin": document.origin(),
        "tables": tables,
        "params": document.params(),
        "rejected_rows": rejected_json(document.rejected_rows()),
    }))
}

/// Merges `table` across `files` and renders the result.
pub fn merge(config: &Config, table: &str, files: &[PathBuf], format: OutputFormat) -> CliResult<String> {
    let registry = config.registry()?;
    let sources: Vec<Source> = files.iter().cloned().map(Source::from).collect();
    let report = TableLoader::new(&registry, config.load.clone()).load_report(&sources, table)?;

    match format {
        OutputFormat::Json => {
            let mut text = serde_json::to_string_pretty(&report_json(&report))?;
            text.push('\n');
            Ok(text)
        }
        OutputFormat::Xml => {
            let writer = DocumentWriter::new(config.load.parse.format.clone());
            Ok(writer.render(std::slice::from_ref(&report.table), &[]))
        }
    }
}

fn report_json(report: &LoadReport) -> Value {
    json!({
        "table": report.table,
        "sources_loaded": report.sources_loaded,
        "sources_skipped": report.sources_skipped,
        "rejected_rows": rejected_json(&report.rejected_rows),
    })
}

fn rejected_json(rejected: &[crate::document::RejectedRow]) -> Value {
    rejected
        .iter()
        .map(|r| {
            json!({
                "table": r.table,
                "row": r.row,
                "code": r.error.code(),
                "message": r.error.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<LIGO_LW>
	<Param Name="ifos:param" Type="lstring">H1L1</Param>
	<Table Name="postcoh:table">
		<Column Name="postcoh:event_id" Type="ilwd:char"/>
		<Column Name="postcoh:far" Type="real_4"/>
		<Stream Name="postcoh:table" Type="Local" Delimiter=",">
			"postcoh:event_id:1",1e-7,
			"postcoh:event_id:2",2e-7
		</Stream>
	</Table>
</LIGO_LW>
"#;

    fn setup() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.xml");
        fs::write(&path, DOC).unwrap();
        (dir, path)
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.severity().unwrap(), Severity::Warn);

        let bad = Config {
            log_level: "chatty".into(),
            ..Config::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"log_level": "info", "register_postcoh": true, "load": {"missing_table": "skip"}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.register_postcoh);
        assert_eq!(config.load.missing_table, MissingTablePolicy::Skip);

        fs::write(&path, r#"{"load": {"parallelism": {"parallel": {"workers": 0}}}}"#).unwrap();
        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.code_str(), "LIGOLW_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_tables_report() {
        let (_dir, path) = setup();
        let report = tables(&Config::default(), &path).unwrap();
        assert_eq!(report["tables"][0]["name"], "postcoh");
        assert_eq!(report["tables"][0]["rows"], 2);
        assert_eq!(report["tables"][0]["columns"][0]["type"], "int_8s");
        assert_eq!(report["params"][0]["value"], "H1L1");
    }

    #[test]
    fn test_merge_json_and_xml() {
        let (_dir, path) = setup();
        let files = vec![path.clone(), path];

        let json_text = merge(&Config::default(), "postcoh", &files, OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&json_text).unwrap();
        assert_eq!(parsed["table"]["rows"].as_array().unwrap().len(), 4);
        assert_eq!(parsed["table"]["rows"][3][0], 2);

        let xml = merge(&Config::default(), "postcoh", &files, OutputFormat::Xml).unwrap();
        assert!(xml.contains("<Column Name=\"postcoh:event_id\" Type=\"int_8s\"/>"));
    }

    #[test]
    fn test_merge_missing_table_code() {
        let (_dir, path) = setup();
        let err = merge(&Config::default(), "sngl_inspiral", &[path], OutputFormat::Json).unwrap_err();
        assert_eq!(err.code_str(), "LIGOLW_MISSING_TABLE");
    }
}
