//! Bootstrap token support and escrow status

use std::path::Path;

use serde::Serialize;

use crate::observability::{log_event, Event};
use crate::probe::{decoded_stdout, log_exit_status, CommandRunner};

/// Printed by `profiles status` when the server accepts a bootstrap token
pub const SUPPORTED_MARKER: &str = "Bootstrap Token supported on server: YES";

/// Printed by `profiles status` once a token has been escrowed
pub const ESCROWED_MARKER: &str = "Bootstrap Token escrowed to server: YES";

/// Support and escrow facts, re-derived on every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapTokenState {
    pub supported: bool,
    pub escrowed: bool,
}

impl BootstrapTokenState {
    /// Classify `profiles status -type bootstraptoken` output.
    ///
    /// The escrowed marker only counts when the supported marker is present.
    pub fn from_status_output(output: &str) -> Self {
        if !output.contains(SUPPORTED_MARKER) {
            return Self::default();
        }
        Self {
            supported: true,
            escrowed: output.contains(ESCROWED_MARKER),
        }
    }
}

/// Runs `profiles status` and classifies the result.
pub struct BootstrapStatusChecker<'a> {
    runner: &'a dyn CommandRunner,
    profiles: &'a Path,
}

impl<'a> BootstrapStatusChecker<'a> {
    pub fn new(runner: &'a dyn CommandRunner, profiles: &'a Path) -> Self {
        Self { runner, profiles }
    }

    /// `{false, false}` whenever the tool cannot be run or read.
    pub fn check_status(&self) -> BootstrapTokenState {
        let output = match self
            .runner
            .run(self.profiles, &["status", "-type", "bootstraptoken"])
        {
            Ok(output) => output,
            Err(_) => return BootstrapTokenState::default(),
        };
        if !output.success() {
            // The status text is still authoritative when present
            log_exit_status(self.profiles, &output);
        }

        let state = match decoded_stdout(self.profiles, &output) {
            Some(text) => BootstrapTokenState::from_status_output(text),
            None => BootstrapTokenState::default(),
        };

        let summary = match (state.supported, state.escrowed) {
            (false, _) => "not supported",
            (true, false) => "supported, not escrowed",
            (true, true) => "already escrowed",
        };
        log_event(
            Event::BootstrapStatusChecked,
            &[
                ("supported", &state.supported.to_string()),
                ("escrowed", &state.escrowed.to_string()),
                ("summary", summary),
            ],
        );
        state
    }
}
