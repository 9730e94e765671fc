//! CLI-specific error types

use std::fmt;
use std::io;

use crate::errors::LigolwError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout or output file)
    IoError,
    /// Parse or merge failure, with its own code
    Ligolw(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "LIGOLW_CLI_CONFIG_ERROR",
            Self::IoError => "LIGOLW_CLI_IO_ERROR",
            Self::Ligolw(code) => *code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<LigolwError> for CliError {
    fn from(e: LigolwError) -> Self {
        Self::new(CliErrorCode::Ligolw(e.code()), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ligolw_code_preserved() {
        let err = CliError::from(LigolwError::MissingTable {
            origin: "a.xml".into(),
            table: "postcoh".into(),
        });
        assert_eq!(err.code_str(), "LIGOLW_MISSING_TABLE");
        assert!(err.to_string().starts_with("LIGOLW_MISSING_TABLE: a.xml"));
    }

    #[test]
    fn test_config_error_display() {
        let err = CliError::config_error("workers must be > 0");
        assert_eq!(err.to_string(), "LIGOLW_CLI_CONFIG_ERROR: workers must be > 0");
    }
}
