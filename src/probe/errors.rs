//! # Probe Errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// External command errors.
///
/// A non-zero exit status is not an error at this level; callers decide what
/// a given tool's status means.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to launch {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            ProbeError::Launch { .. } => "BB_PROBE_LAUNCH_FAILED",
        }
    }
}
