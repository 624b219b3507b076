//! # Escrow Errors

use serde::Serialize;
use thiserror::Error;

use crate::probe::ProbeError;

/// Result type for escrow operations
pub type EscrowResult<T> = Result<T, EscrowError>;

/// Escrow attempt failures.
///
/// Raised by the installer and always caught by the orchestrator.
#[derive(Debug, Error)]
pub enum EscrowError {
    /// `profiles install` ran and exited non-zero
    #[error("profiles terminated with non-zero exit status {exit_code}")]
    ProfilesFailed { exit_code: i32, stderr: String },

    /// `profiles` could not be started
    #[error(transparent)]
    Launch(#[from] ProbeError),
}

impl EscrowError {
    pub fn kind(&self) -> EscrowErrorKind {
        match self {
            EscrowError::ProfilesFailed { exit_code, .. } => EscrowErrorKind::ProfilesFailed {
                exit_code: *exit_code,
            },
            EscrowError::Launch(_) => EscrowErrorKind::LaunchFailed,
        }
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            EscrowError::ProfilesFailed { .. } => "BB_ESCROW_PROFILES_FAILED",
            EscrowError::Launch(_) => "BB_ESCROW_LAUNCH_FAILED",
        }
    }
}

/// Summary of an escrow failure, kept in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscrowErrorKind {
    ProfilesFailed { exit_code: i32 },
    LaunchFailed,
}

/// Result of one escrow attempt, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EscrowOutcome {
    pub success: bool,
    pub error_kind: Option<EscrowErrorKind>,
}

impl EscrowOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error_kind: None,
        }
    }

    pub fn failed(kind: EscrowErrorKind) -> Self {
        Self {
            success: false,
            error_kind: Some(kind),
        }
    }
}

impl From<&EscrowResult<()>> for EscrowOutcome {
    fn from(result: &EscrowResult<()>) -> Self {
        match result {
            Ok(()) => Self::succeeded(),
            Err(e) => Self::failed(e.kind()),
        }
    }
}
