//! CLI argument definitions using clap
//!
//! Commands:
//! - bootstrap-escrow invoke
//! - bootstrap-escrow status | validity | endpoint
//! - bootstrap-escrow reachable [--host <fqdn>] [--port <port>]
//! - bootstrap-escrow is-admin | elevate | demote <username>
//!
//! `--config <path>` is accepted by every command.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::reachability::DEFAULT_PORT;

/// Bootstrap token escrow at login
#[derive(Parser, Debug)]
#[command(name = "bootstrap-escrow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the login-time escrow decision with credentials read from stdin
    Invoke,

    /// Report whether the server supports and holds a bootstrap token
    Status,

    /// Report whether the server still accepts the escrowed token
    Validity,

    /// Print the management server endpoint
    Endpoint,

    /// Check that the management server accepts TCP connections
    Reachable {
        /// Host to probe instead of the enrolled server
        #[arg(long)]
        host: Option<String>,

        /// Port used with --host
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Check admin group membership
    IsAdmin {
        /// Short user name
        username: String,
    },

    /// Add a user to the admin group
    Elevate {
        /// Short user name
        username: String,
    },

    /// Remove a user from the admin group
    Demote {
        /// Short user name
        username: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
