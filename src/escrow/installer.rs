//! Bootstrap token escrow via `profiles install`

use std::path::Path;

use crate::observability::{log_event, Event};
use crate::probe::CommandRunner;

use super::errors::{EscrowError, EscrowResult};

/// Escrows the bootstrap token using the logging-in user's credentials.
pub struct BootstrapTokenInstaller<'a> {
    runner: &'a dyn CommandRunner,
    profiles: &'a Path,
}

impl<'a> BootstrapTokenInstaller<'a> {
    pub fn new(runner: &'a dyn CommandRunner, profiles: &'a Path) -> Self {
        Self { runner, profiles }
    }

    /// One `profiles install -type bootstraptoken` run. Zero exit is success.
    pub fn escrow(&self, username: &str, password: &str) -> EscrowResult<()> {
        log_event(Event::EscrowBegin, &[("username", username)]);

        let output = self.runner.run(
            self.profiles,
            &[
                "install",
                "-type",
                "bootstraptoken",
                "-user",
                username,
                "-password",
                password,
            ],
        )?;

        if !output.success() {
            return Err(EscrowError::ProfilesFailed {
                exit_code: output.exit_code,
                stderr: output.stderr_lossy(),
            });
        }

        log_event(Event::EscrowComplete, &[("username", username)]);
        Ok(())
    }
}
