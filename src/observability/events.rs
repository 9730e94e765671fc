//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// CLI configuration file read
    ConfigLoaded,
    /// Table schema added to a registry
    SchemaRegistered,
    /// Schema directory loaded
    SchemasLoaded,

    // Parsing
    /// One table of a document fully parsed
    TableParsed,
    /// Row skipped in permissive mode
    RowRejected,
    /// Legacy identifiers rewritten to integers
    IlwdConverted,

    // Loading
    /// Source contributed rows to a merge
    SourceLoaded,
    /// Source lacked the table and was skipped
    SourceSkipped,
    /// Source failed to parse
    SourceFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaRegistered => "SCHEMA_REGISTERED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",

            Event::TableParsed => "TABLE_PARSED",
            Event::RowRejected => "ROW_REJECTED",
            Event::IlwdConverted => "ILWD_CONVERTED",

            Event::SourceLoaded => "SOURCE_LOADED",
            Event::SourceSkipped => "SOURCE_SKIPPED",
            Event::SourceFailed => "SOURCE_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::TableParsed | Event::SourceLoaded => Severity::Trace,
            Event::RowRejected | Event::SourceSkipped => Severity::Warn,
            Event::SourceFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::SchemaRegistered,
            Event::SchemasLoaded,
            Event::TableParsed,
            Event::RowRejected,
            Event::IlwdConverted,
            Event::SourceLoaded,
            Event::SourceSkipped,
            Event::SourceFailed,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::RowRejected.severity(), Severity::Warn);
        assert_eq!(Event::SourceFailed.severity(), Severity::Error);
        assert_eq!(Event::SchemasLoaded.severity(), Severity::Info);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::IlwdConverted), "ILWD_CONVERTED");
    }
}
