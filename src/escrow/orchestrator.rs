//! Escrow decision state machine
//!
//! ```text
//! Start -> CheckedStatus -> {Allow | CheckedValidity}
//!       -> {Allow | CredentialsGathered} -> {Allow | EscrowAttempted} -> Allow
//! ```
//!
//! `Allow` is the only terminal stage. Every path ends by telling the host to
//! let the login proceed; an escrow failure is logged and swallowed.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::bootstrap::{BootstrapTokenState, StatusSource};
use crate::context::{ContextAccessor, Decision, HostContext};
use crate::observability::{log_event, Event};
use crate::reachability::is_reachable;

use super::errors::{EscrowError, EscrowOutcome};
use super::installer::BootstrapTokenInstaller;

/// Stages a run passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStage {
    Start,
    CheckedStatus,
    CheckedValidity,
    CredentialsGathered,
    EscrowAttempted,
    Allow,
}

/// Why a run reached `Allow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AllowReason {
    /// The server does not accept a bootstrap token
    NotSupported,
    /// Already escrowed and the server still accepts it
    EscrowedAndValid,
    /// Username or password missing from the host context
    MissingCredentials,
    /// Reachability gate enabled and the server could not be reached
    ServerUnreachable,
    /// Escrow was attempted, successfully or not
    EscrowAttempted { outcome: EscrowOutcome },
}

impl AllowReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllowReason::NotSupported => "not_supported",
            AllowReason::EscrowedAndValid => "escrowed_and_valid",
            AllowReason::MissingCredentials => "missing_credentials",
            AllowReason::ServerUnreachable => "server_unreachable",
            AllowReason::EscrowAttempted { .. } => "escrow_attempted",
        }
    }
}

/// What one run observed and decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscrowReport {
    pub run_id: Uuid,
    pub decision: Decision,
    pub status: BootstrapTokenState,
    /// `None` when validity was not queried
    pub valid: Option<bool>,
    #[serde(flatten)]
    pub reason: AllowReason,
    pub stages: Vec<EscrowStage>,
}

impl EscrowReport {
    pub fn escrow_attempted(&self) -> bool {
        matches!(self.reason, AllowReason::EscrowAttempted { .. })
    }
}

/// Facts gathered while walking the stages.
struct Trace {
    run_id: String,
    stages: Vec<EscrowStage>,
    status: BootstrapTokenState,
    valid: Option<bool>,
}

impl Trace {
    fn enter(&mut self, stage: EscrowStage) {
        self.stages.push(stage);
    }
}

/// Sequences the probes into the login-time escrow decision.
pub struct EscrowOrchestrator<'a> {
    status: &'a dyn StatusSource,
    installer: BootstrapTokenInstaller<'a>,
    reachability_gate: Option<Duration>,
}

impl<'a> EscrowOrchestrator<'a> {
    pub fn new(status: &'a dyn StatusSource, installer: BootstrapTokenInstaller<'a>) -> Self {
        Self {
            status,
            installer,
            reachability_gate: None,
        }
    }

    /// Skip escrow unless the management server answers within `timeout`.
    pub fn with_reachability_gate(mut self, timeout: Duration) -> Self {
        self.reachability_gate = Some(timeout);
        self
    }

    /// Run the decision for one login attempt and signal `Allow` to the host.
    pub fn run<H: HostContext + ?Sized>(&self, host: &H) -> EscrowReport {
        let run_id = Uuid::new_v4();
        let mut trace = Trace {
            run_id: run_id.to_string(),
            stages: vec![EscrowStage::Start],
            status: BootstrapTokenState::default(),
            valid: None,
        };
        log_event(Event::EscrowRunBegin, &[("run_id", &trace.run_id)]);

        let reason = self.decide(host, &mut trace);

        trace.enter(EscrowStage::Allow);
        allow_login(host, &trace.run_id);
        log_event(
            Event::EscrowRunComplete,
            &[("run_id", &trace.run_id), ("reason", reason.as_str())],
        );

        EscrowReport {
            run_id,
            decision: Decision::Allow,
            status: trace.status,
            valid: trace.valid,
            reason,
            stages: trace.stages,
        }
    }

    fn decide<H: HostContext + ?Sized>(&self, host: &H, trace: &mut Trace) -> AllowReason {
        trace.status = self.status.bootstrap_status();
        trace.enter(EscrowStage::CheckedStatus);
        if !trace.status.supported {
            return AllowReason::NotSupported;
        }

        if trace.status.escrowed {
            let valid = self.status.bootstrap_valid();
            trace.valid = Some(valid);
            trace.enter(EscrowStage::CheckedValidity);
            if valid {
                return AllowReason::EscrowedAndValid;
            }
            // Escrowed but rejected by the server: escrow again
        }

        let accessor = ContextAccessor::new(host);
        let Some(username) = accessor.username() else {
            log_event(
                Event::CredentialsUnavailable,
                &[("run_id", &trace.run_id), ("missing", "username")],
            );
            return AllowReason::MissingCredentials;
        };
        let Some(password) = accessor.password() else {
            log_event(
                Event::CredentialsUnavailable,
                &[("run_id", &trace.run_id), ("missing", "password")],
            );
            return AllowReason::MissingCredentials;
        };
        trace.enter(EscrowStage::CredentialsGathered);

        if let Some(timeout) = self.reachability_gate {
            let reachable = self
                .status
                .server_endpoint()
                .map(|endpoint| is_reachable(&endpoint, timeout))
                .unwrap_or(false);
            if !reachable {
                log_event(Event::ServerUnreachable, &[("run_id", &trace.run_id)]);
                return AllowReason::ServerUnreachable;
            }
        }

        let result = self.installer.escrow(&username, &password);
        trace.enter(EscrowStage::EscrowAttempted);
        if let Err(e) = &result {
            log_escrow_failure(&trace.run_id, e);
        }
        AllowReason::EscrowAttempted {
            outcome: EscrowOutcome::from(&result),
        }
    }
}

fn log_escrow_failure(run_id: &str, error: &EscrowError) {
    let reason = error.to_string();
    match error {
        EscrowError::ProfilesFailed { exit_code, stderr } => log_event(
            Event::EscrowFailed,
            &[
                ("run_id", run_id),
                ("code", error.code()),
                ("reason", &reason),
                ("exit_code", &exit_code.to_string()),
                ("stderr", stderr),
            ],
        ),
        EscrowError::Launch(_) => log_event(
            Event::EscrowFailed,
            &[("run_id", run_id), ("code", error.code()), ("reason", &reason)],
        ),
    }
}

/// The only outward decision this crate makes.
fn allow_login<H: HostContext + ?Sized>(host: &H, run_id: &str) {
    match host.set_result(Decision::Allow) {
        Ok(()) => log_event(Event::LoginAllowed, &[("run_id", run_id)]),
        Err(e) => log_event(
            Event::HostResultFailed,
            &[("run_id", run_id), ("code", e.code()), ("reason", &e.to_string())],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemoryHost, PASSWORD_KEY, USERNAME_KEY};
    use crate::escrow::EscrowErrorKind;
    use crate::probe::fake::ScriptedRunner;
    use crate::probe::CommandOutput;
    use crate::reachability::ServerEndpoint;
    use std::path::Path;

    const PROFILES: &str = "/usr/bin/profiles";

    struct FixedStatus {
        state: BootstrapTokenState,
        valid: bool,
        endpoint: Option<ServerEndpoint>,
    }

    impl StatusSource for FixedStatus {
        fn bootstrap_status(&self) -> BootstrapTokenState {
            self.state
        }

        fn bootstrap_valid(&self) -> bool {
            self.valid
        }

        fn server_endpoint(&self) -> Option<ServerEndpoint> {
            self.endpoint.clone()
        }
    }

    fn status(supported: bool, escrowed: bool, valid: bool) -> FixedStatus {
        FixedStatus {
            state: BootstrapTokenState { supported, escrowed },
            valid,
            endpoint: None,
        }
    }

    fn host() -> MemoryHost {
        MemoryHost::new()
            .with_value(USERNAME_KEY, b"alice\0".to_vec())
            .with_value(PASSWORD_KEY, b"hunter2\0".to_vec())
    }

    fn profiles(exit_code: i32) -> ScriptedRunner {
        ScriptedRunner::new().respond(PROFILES, "install", CommandOutput::new("", exit_code))
    }

    #[test]
    fn test_unsupported_allows_without_escrow() {
        let runner = profiles(0);
        let source = status(false, false, false);
        let installer = BootstrapTokenInstaller::new(&runner, Path::new(PROFILES));
        let host = host();

        let report = EscrowOrchestrator::new(&source, installer).run(&host);

        assert_eq!(report.reason, AllowReason::NotSupported);
        assert_eq!(
            report.stages,
            vec![EscrowStage::Start, EscrowStage::CheckedStatus, EscrowStage::Allow]
        );
        assert_eq!(report.valid, None);
        assert_eq!(runner.count(PROFILES, "install"), 0);
        assert_eq!(host.decision(), Some(Decision::Allow));
    }

    #[test]
    fn test_escrowed_and_valid_allows_without_escrow() {
        let runner = profiles(0);
        let source = status(true, true, true);
        let installer = BootstrapTokenInstaller::new(&runner, Path::new(PROFILES));
        let host = host();

        let report = EscrowOrchestrator::new(&source, installer).run(&host);

        assert_eq!(report.reason, AllowReason::EscrowedAndValid);
        assert_eq!(report.valid, Some(true));
        assert_eq!(runner.count(PROFILES, "install"), 0);
        assert_eq!(host.decision(), Some(Decision::Allow));
    }

    #[test]
    fn test_escrowed_but_invalid_escrows_again() {
        let runner = profiles(0);
        let source = status(true, true, false);
        let installer = BootstrapTokenInstaller::new(&runner, Path::new(PROFILES));
        let host = host();

        let report = EscrowOrchestrator::new(&source, installer).run(&host);

        assert_eq!(
            report.stages,
            vec![
                EscrowStage::Start,
                EscrowStage::CheckedStatus,
                EscrowStage::CheckedValidity,
                EscrowStage::CredentialsGathered,
                EscrowStage::EscrowAttempted,
                EscrowStage::Allow,
            ]
        );
        assert_eq!(runner.count(PROFILES, "install"), 1);
        assert!(report.escrow_attempted());
    }

    #[test]
    fn test_not_escrowed_skips_validity() {
        let runner = profiles(0);
        let source = status(true, false, true);
        let installer = BootstrapTokenInstaller::new(&runner, Path::new(PROFILES));
        let host = host();

        let report = EscrowOrchestrator::new(&source, installer).run(&host);

        assert_eq!(report.valid, None);
        assert!(!report.stages.contains(&EscrowStage::CheckedValidity));
        assert_eq!(
            report.reason,
            AllowReason::EscrowAttempted {
                outcome: EscrowOutcome::succeeded()
            }
        );
        let calls = runner.calls();
        let (_, args) = &calls[0];
        assert_eq!(args[4], "alice");
        assert_eq!(args[6], "hunter2");
    }

    #[test]
    fn test_missing_password_allows_without_escrow() {
        let runner = profiles(0);
        let source = status(true, false, false);
        let installer = BootstrapTokenInstaller::new(&runner, Path::new(PROFILES));
        let host = MemoryHost::new().with_value(USERNAME_KEY, "alice");

        let report = EscrowOrchestrator::new(&source, installer).run(&host);

        assert_eq!(report.reason, AllowReason::MissingCredentials);
        assert_eq!(runner.count(PROFILES, "install"), 0);
        assert_eq!(host.decision(), Some(Decision::Allow));
    }

    #[test]
    fn test_escrow_failure_still_allows() {
        let runner = profiles(1);
        let source = status(true, false, false);
        let installer = BootstrapTokenInstaller::new(&runner, Path::new(PROFILES));
        let host = host();

        let report = EscrowOrchestrator::new(&source, installer).run(&host);

        assert_eq!(
            report.reason,
            AllowReason::EscrowAttempted {
                outcome: EscrowOutcome::failed(EscrowErrorKind::ProfilesFailed { exit_code: 1 })
            }
        );
        assert_eq!(report.decision, Decision::Allow);
        assert_eq!(host.decision(), Some(Decision::Allow));
        assert_eq!(runner.count(PROFILES, "install"), 1);
    }

    #[test]
    fn test_gate_without_endpoint_skips_escrow() {
        let runner = profiles(0);
        let source = status(true, false, false);
        let installer = BootstrapTokenInstaller::new(&runner, Path::new(PROFILES));
        let host = host();

        let report = EscrowOrchestrator::new(&source, installer)
            .with_reachability_gate(Duration::from_millis(500))
            .run(&host);

        assert_eq!(report.reason, AllowReason::ServerUnreachable);
        assert_eq!(runner.count(PROFILES, "install"), 0);
        assert_eq!(host.decision(), Some(Decision::Allow));
    }

    #[test]
    fn test_report_serializes_flat_reason() {
        let runner = profiles(0);
        let source = status(false, false, false);
        let installer = BootstrapTokenInstaller::new(&runner, Path::new(PROFILES));
        let report = EscrowOrchestrator::new(&source, installer).run(&host());

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["decision"], "allow");
        assert_eq!(value["reason"], "not_supported");
        assert_eq!(value["status"]["supported"], false);
        assert_eq!(value["stages"][0], "start");
    }
}
