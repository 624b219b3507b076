//! Login-time bootstrap token escrow
//!
//! The orchestrator checks the token's state, escrows it with the logging-in
//! user's credentials when the server lacks a usable one, and always allows
//! the login.

mod errors;
mod installer;
mod orchestrator;

pub use errors::{EscrowError, EscrowErrorKind, EscrowOutcome, EscrowResult};
pub use installer::BootstrapTokenInstaller;
pub use orchestrator::{AllowReason, EscrowOrchestrator, EscrowReport, EscrowStage};
