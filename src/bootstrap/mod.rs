//! Bootstrap token facts
//!
//! Support, escrow and validity are scraped from `profiles` and `mdmclient`
//! text. The orchestrator only sees them through [`StatusSource`], so a
//! structured data source can replace the scraping without touching it.

mod status;
mod validity;

pub use status::{BootstrapStatusChecker, BootstrapTokenState, ESCROWED_MARKER, SUPPORTED_MARKER};
pub use validity::{BootstrapValidityChecker, PREFLIGHT_SUCCESS_MARKER};

use crate::probe::{CommandRunner, ToolPaths};
use crate::reachability::{EndpointResolver, ServerEndpoint};

/// Device facts the escrow decision depends on.
pub trait StatusSource {
    fn bootstrap_status(&self) -> BootstrapTokenState;

    /// Only meaningful when the token is escrowed.
    fn bootstrap_valid(&self) -> bool;

    fn server_endpoint(&self) -> Option<ServerEndpoint>;
}

/// [`StatusSource`] backed by the system tools' text output.
pub struct ToolStatusSource<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a ToolPaths,
}

impl<'a> ToolStatusSource<'a> {
    pub fn new(runner: &'a dyn CommandRunner, tools: &'a ToolPaths) -> Self {
        Self { runner, tools }
    }
}

impl StatusSource for ToolStatusSource<'_> {
    fn bootstrap_status(&self) -> BootstrapTokenState {
        BootstrapStatusChecker::new(self.runner, &self.tools.profiles).check_status()
    }

    fn bootstrap_valid(&self) -> bool {
        BootstrapValidityChecker::new(self.runner, &self.tools.mdmclient).check_validity()
    }

    fn server_endpoint(&self) -> Option<ServerEndpoint> {
        EndpointResolver::new(self.runner, &self.tools.mdmclient).server_endpoint()
    }
}
