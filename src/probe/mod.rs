//! External status probe
//!
//! Every fact this crate knows about the device comes from running a system
//! tool and reading what it prints. This module owns that primitive.

mod errors;
mod runner;

pub use errors::{ProbeError, ProbeResult};
pub use runner::{CommandOutput, CommandRunner, SystemCommandRunner, ToolPaths};

pub(crate) use runner::{decoded_stdout, log_exit_status};

#[cfg(test)]
pub(crate) use runner::fake;
