//! CLI argument definitions using clap
//!
//! Commands:
//! - spiir-ligolw tables <file>
//! - spiir-ligolw merge --table <name> <files...>

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Inspect and merge LIGO_LW tabular XML documents
#[derive(Parser, Debug)]
#[command(name = "spiir-ligolw")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Path to a JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory of JSON table schema definitions to register
    #[arg(long)]
    pub schema_dir: Option<PathBuf>,

    /// Register the postcoh table schema
    #[arg(long)]
    pub postcoh: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the tables, columns, row counts and params of a document
    Tables {
        #[command(flatten)]
        common: CommonArgs,

        /// Document to inspect
        file: PathBuf,
    },

    /// Merge one table across documents, in the order given
    Merge {
        #[command(flatten)]
        common: CommonArgs,

        /// Table to extract from every document
        #[arg(long)]
        table: String,

        /// Parse documents on this many worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Skip documents that lack the table
        #[arg(long)]
        ignore_missing: bool,

        /// Skip bad rows instead of failing
        #[arg(long)]
        permissive: bool,

        /// Keep only these columns, in this order
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Documents to merge
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Xml,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_merge() {
        let cli = Cli::try_parse_from([
            "spiir-ligolw",
            "merge",
            "--table",
            "postcoh",
            "--postcoh",
            "--workers",
            "4",
            "--columns",
            "event_id,far",
            "a.xml",
            "b.xml",
        ])
        .unwrap();

        match cli.command {
            Command::Merge {
                common,
                table,
                workers,
                columns,
                format,
                files,
                ..
            } => {
                assert!(common.postcoh);
                assert_eq!(table, "postcoh");
                assert_eq!(workers, Some(4));
                assert_eq!(columns, vec!["event_id", "far"]);
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(files.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_merge_requires_files() {
        assert!(Cli::try_parse_from(["spiir-ligolw", "merge", "--table", "postcoh"]).is_err());
    }
}
