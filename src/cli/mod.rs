//! CLI module
//!
//! Provides command-line access to:
//! - invoke: the login-time escrow decision
//! - status / validity / endpoint / reachable: individual probes
//! - is-admin / elevate / demote: admin group membership

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    demote, elevate, endpoint, execute, invoke, is_admin, reachable, run, run_command, status,
    validity,
};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_response};
