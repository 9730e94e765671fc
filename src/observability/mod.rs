//! Observability subsystem
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed lifecycle events
//! - Begin/complete scopes around loads
//!
//! Observability is read-only: nothing here changes a parse or a merge.
//!
//! ```ignore
//! use spiir_ligolw::observability::{Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Info);
//! Logger::info("MERGE_WRITTEN", &[("rows", "42")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
