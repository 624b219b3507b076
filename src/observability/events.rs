//! Observable events of the escrow mechanism
//!
//! Events are explicit and typed. Every log line emitted by the crate names
//! one of these.

use std::fmt;

use super::logger::Severity;

/// Observable events
///
/// Grouped by the component that emits them:
/// - Orchestration
/// - Host context
/// - External commands
/// - Bootstrap token status and validity
/// - Management server endpoint and reachability
/// - Admin group membership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Orchestration
    /// Escrow decision run started
    EscrowRunBegin,
    /// Escrow decision run reached Allow
    EscrowRunComplete,
    /// Terminal allow signal delivered to the host
    LoginAllowed,
    /// Host rejected the terminal signal
    HostResultFailed,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,
    /// Configuration unusable, defaults applied
    ConfigRejected,

    // Host context
    /// Context value could not be read
    ContextValueUnavailable,
    /// Username or password missing, escrow skipped
    CredentialsUnavailable,

    // External commands
    /// External command launched
    CommandLaunched,
    /// External command could not be launched
    CommandLaunchFailed,
    /// External command exited non-zero
    CommandExitNonZero,
    /// External command output was not UTF-8
    CommandOutputUndecodable,

    // Bootstrap token
    /// Support/escrow status determined
    BootstrapStatusChecked,
    /// Validity determined
    BootstrapValidityChecked,
    /// Escrow attempt started
    EscrowBegin,
    /// Escrow attempt succeeded
    EscrowComplete,
    /// Escrow attempt failed
    EscrowFailed,

    // Management server
    /// Management server endpoint parsed
    EndpointResolved,
    /// Management server endpoint not found
    EndpointUnavailable,
    /// Connection attempt changed state
    ConnectionState,
    /// Reachability attempt ran out of time
    ReachabilityTimeout,
    /// Escrow skipped because the server could not be reached
    ServerUnreachable,

    // Admin group
    /// Admin membership queried
    AdminMembershipChecked,
    /// User added to admin group
    ElevateComplete,
    /// Adding user to admin group failed
    ElevateFailed,
    /// User removed from admin group
    DemoteComplete,
    /// Removing user from admin group failed
    DemoteFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::EscrowRunBegin => "ESCROW_RUN_BEGIN",
            Event::EscrowRunComplete => "ESCROW_RUN_COMPLETE",
            Event::LoginAllowed => "LOGIN_ALLOWED",
            Event::HostResultFailed => "HOST_RESULT_FAILED",

            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ConfigRejected => "CONFIG_REJECTED",

            Event::ContextValueUnavailable => "CONTEXT_VALUE_UNAVAILABLE",
            Event::CredentialsUnavailable => "CREDENTIALS_UNAVAILABLE",

            Event::CommandLaunched => "COMMAND_LAUNCHED",
            Event::CommandLaunchFailed => "COMMAND_LAUNCH_FAILED",
            Event::CommandExitNonZero => "COMMAND_EXIT_NON_ZERO",
            Event::CommandOutputUndecodable => "COMMAND_OUTPUT_UNDECODABLE",

            Event::BootstrapStatusChecked => "BOOTSTRAP_STATUS_CHECKED",
            Event::BootstrapValidityChecked => "BOOTSTRAP_VALIDITY_CHECKED",
            Event::EscrowBegin => "ESCROW_BEGIN",
            Event::EscrowComplete => "ESCROW_COMPLETE",
            Event::EscrowFailed => "ESCROW_FAILED",

            Event::EndpointResolved => "ENDPOINT_RESOLVED",
            Event::EndpointUnavailable => "ENDPOINT_UNAVAILABLE",
            Event::ConnectionState => "CONNECTION_STATE",
            Event::ReachabilityTimeout => "REACHABILITY_TIMEOUT",
            Event::ServerUnreachable => "SERVER_UNREACHABLE",

            Event::AdminMembershipChecked => "ADMIN_MEMBERSHIP_CHECKED",
            Event::ElevateComplete => "ELEVATE_COMPLETE",
            Event::ElevateFailed => "ELEVATE_FAILED",
            Event::DemoteComplete => "DEMOTE_COMPLETE",
            Event::DemoteFailed => "DEMOTE_FAILED",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::HostResultFailed
            | Event::CommandLaunchFailed
            | Event::EscrowFailed
            | Event::ElevateFailed
            | Event::DemoteFailed
            | Event::ReachabilityTimeout => Severity::Error,

            Event::ConfigRejected
            | Event::ContextValueUnavailable
            | Event::CredentialsUnavailable
            | Event::CommandExitNonZero
            | Event::CommandOutputUndecodable
            | Event::EndpointUnavailable
            | Event::ServerUnreachable => Severity::Warn,

            Event::CommandLaunched | Event::ConnectionState => Severity::Trace,

            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
