//! CLI module
//!
//! Provides command-line interface for:
//! - tables: describe the tables and params of one document
//! - merge: merge one table across many documents

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, CommonArgs, OutputFormat};
pub use commands::{merge, run, run_command, tables, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_json, write_text};
