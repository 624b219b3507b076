//! Management server reachability
//!
//! Two steps: find out which server the device is enrolled with (from
//! `mdmclient DumpManagementStatus`), then see whether a TCP connection to
//! it completes within a bounded time.

mod connection;
mod endpoint;

use std::path::Path;
use std::time::Duration;

pub use connection::{is_reachable, ConnectionState, DEFAULT_TIMEOUT};
pub use endpoint::{EndpointResolver, ServerEndpoint, DEFAULT_PORT};

use crate::probe::CommandRunner;

/// Endpoint discovery plus a bounded connectivity check.
pub struct ReachabilityProbe<'a> {
    resolver: EndpointResolver<'a>,
    timeout: Duration,
}

impl<'a> ReachabilityProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner, mdmclient: &'a Path, timeout: Duration) -> Self {
        Self {
            resolver: EndpointResolver::new(runner, mdmclient),
            timeout,
        }
    }

    pub fn server_endpoint(&self) -> Option<ServerEndpoint> {
        self.resolver.server_endpoint()
    }

    pub fn is_reachable(&self, endpoint: &ServerEndpoint) -> bool {
        is_reachable(endpoint, self.timeout)
    }

    /// `None` when no endpoint could be determined.
    pub fn check_server(&self) -> Option<bool> {
        self.server_endpoint()
            .map(|endpoint| self.is_reachable(&endpoint))
    }
}
