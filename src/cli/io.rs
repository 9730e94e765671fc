//! Output handling for CLI
//!
//! Results go to stdout (or an output file); logs stay on stderr.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Write one pretty-printed JSON document
pub fn write_json(value: &Value, output: Option<&Path>) -> CliResult<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    write_text(&text, output)
}

/// Write raw text to `output`, or stdout when absent
pub fn write_text(text: &str, output: Option<&Path>) -> CliResult<()> {
    match output {
        Some(path) => fs::write(path, text).map_err(|e| {
            CliError::io_error(format!("Failed to write {}: {}", path.display(), e))
        }),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
