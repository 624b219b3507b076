//! Bootstrap token validity

use std::path::Path;

use crate::observability::{log_event, Event};
use crate::probe::{decoded_stdout, log_exit_status, CommandRunner};

/// Printed by `mdmclient QueryDeviceInformation` when the escrowed token
/// passes the server's preflight
pub const PREFLIGHT_SUCCESS_MARKER: &str = "EACSPreflight = success";

/// Runs `mdmclient QueryDeviceInformation` and looks for the preflight marker.
pub struct BootstrapValidityChecker<'a> {
    runner: &'a dyn CommandRunner,
    mdmclient: &'a Path,
}

impl<'a> BootstrapValidityChecker<'a> {
    pub fn new(runner: &'a dyn CommandRunner, mdmclient: &'a Path) -> Self {
        Self { runner, mdmclient }
    }

    /// Any failure reads as "not valid", which leads to re-escrow.
    pub fn check_validity(&self) -> bool {
        let valid = self.query();
        log_event(
            Event::BootstrapValidityChecked,
            &[("valid", &valid.to_string())],
        );
        valid
    }

    fn query(&self) -> bool {
        let Ok(output) = self.runner.run(self.mdmclient, &["QueryDeviceInformation"]) else {
            return false;
        };
        if !output.success() {
            log_exit_status(self.mdmclient, &output);
            return false;
        }
        decoded_stdout(self.mdmclient, &output)
            .map(|text| text.contains(PREFLIGHT_SUCCESS_MARKER))
            .unwrap_or(false)
    }
}
