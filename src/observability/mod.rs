//! Observability for the escrow mechanism
//!
//! Provides:
//! - Structured logging (JSON, one event per line, stderr)
//! - Typed lifecycle events
//! - Begin/complete scopes with elapsed-time reporting
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on the login decision
//! 3. Credentials never appear in log fields
//!
//! # Usage
//!
//! ```ignore
//! use bootstrap_escrow::observability::{log_event, Event, ObservationScope};
//!
//! log_event(Event::BootstrapStatusChecked, &[("supported", "true")]);
//!
//! let scope = ObservationScope::new("REACHABILITY_CHECK");
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
