//! CLI command implementations
//!
//! Every command prints one `{"status":"ok","data":...}` object on success.
//! `invoke` is the login-time path: it always reaches `allow`, even when the
//! configuration or the request on stdin is unusable.

use serde_json::{json, Value};

use crate::bootstrap::{StatusSource, ToolStatusSource};
use crate::context::MemoryHost;
use crate::escrow::{BootstrapTokenInstaller, EscrowOrchestrator};
use crate::observability::{log_event, Event};
use crate::privilege::PrivilegeManager;
use crate::probe::{CommandRunner, SystemCommandRunner};
use crate::reachability::{ReachabilityProbe, ServerEndpoint};

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli)
}

/// Run a parsed command against the system tools
pub fn run_command(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    let runner = SystemCommandRunner;
    let data = execute(&cli.command, &config, &runner)?;
    write_response(data)
}

fn load_config(cli: &Cli) -> CliResult<Config> {
    let Some(path) = cli.config.as_deref() else {
        return Ok(Config::default());
    };

    match (Config::load(path), &cli.command) {
        (Ok(config), _) => Ok(config),
        (Err(e), Command::Invoke) => {
            log_event(
                Event::ConfigRejected,
                &[
                    ("path", &path.display().to_string()),
                    ("code", e.code_str()),
                    ("reason", e.message()),
                ],
            );
            Ok(Config::default())
        }
        (Err(e), _) => Err(e),
    }
}

/// Dispatch one command. Only `invoke` reads stdin.
pub fn execute(command: &Command, config: &Config, runner: &dyn CommandRunner) -> CliResult<Value> {
    match command {
        Command::Invoke => invoke(config, runner, read_request()),
        Command::Status => status(config, runner),
        Command::Validity => validity(config, runner),
        Command::Endpoint => endpoint(config, runner),
        Command::Reachable { host, port } => reachable(config, runner, host.as_deref(), *port),
        Command::IsAdmin { username } => is_admin(config, runner, username),
        Command::Elevate { username } => elevate(config, runner, username),
        Command::Demote { username } => demote(config, runner, username),
    }
}

/// Run the escrow decision with credentials from `request`.
///
/// An unreadable request means no credentials: the run still completes and
/// allows the login.
pub fn invoke(
    config: &Config,
    runner: &dyn CommandRunner,
    request: CliResult<Value>,
) -> CliResult<Value> {
    let host = match request {
        Ok(request) => MemoryHost::from_request(&request),
        Err(e) => {
            log_event(
                Event::CredentialsUnavailable,
                &[("code", e.code_str()), ("reason", e.message())],
            );
            MemoryHost::new()
        }
    };

    let tools = config.tool_paths();
    let source = ToolStatusSource::new(runner, &tools);
    let installer = BootstrapTokenInstaller::new(runner, &tools.profiles);

    let mut orchestrator = EscrowOrchestrator::new(&source, installer);
    if config.require_reachable_server {
        orchestrator = orchestrator.with_reachability_gate(config.reachability_timeout());
    }

    let report = orchestrator.run(&host);
    Ok(serde_json::to_value(&report)?)
}

pub fn status(config: &Config, runner: &dyn CommandRunner) -> CliResult<Value> {
    let tools = config.tool_paths();
    let state = ToolStatusSource::new(runner, &tools).bootstrap_status();
    Ok(serde_json::to_value(state)?)
}

pub fn validity(config: &Config, runner: &dyn CommandRunner) -> CliResult<Value> {
    let tools = config.tool_paths();
    let valid = ToolStatusSource::new(runner, &tools).bootstrap_valid();
    Ok(json!({ "valid": valid }))
}

pub fn endpoint(config: &Config, runner: &dyn CommandRunner) -> CliResult<Value> {
    let tools = config.tool_paths();
    let endpoint = ToolStatusSource::new(runner, &tools).server_endpoint();
    Ok(json!({ "endpoint": endpoint }))
}

/// Probe `host:port`, or the enrolled server when no host is given.
pub fn reachable(
    config: &Config,
    runner: &dyn CommandRunner,
    host: Option<&str>,
    port: u16,
) -> CliResult<Value> {
    let probe = ReachabilityProbe::new(
        runner,
        &config.mdmclient_path,
        config.reachability_timeout(),
    );

    let endpoint = match host {
        Some(host) => ServerEndpoint::new(host.trim_start_matches('[').trim_end_matches(']'), port),
        None => probe
            .server_endpoint()
            .ok_or_else(CliError::endpoint_unavailable)?,
    };

    let reachable = probe.is_reachable(&endpoint);
    Ok(json!({ "endpoint": endpoint, "reachable": reachable }))
}

fn privileges<'a>(config: &'a Config, runner: &'a dyn CommandRunner) -> PrivilegeManager<'a> {
    PrivilegeManager::new(runner, &config.dscl_path).with_group(&config.admin_group)
}

pub fn is_admin(config: &Config, runner: &dyn CommandRunner, username: &str) -> CliResult<Value> {
    let is_admin = privileges(config, runner).is_admin(username);
    Ok(json!({ "username": username, "is_admin": is_admin }))
}

/// Add to the admin group, then report membership as re-read from `dscl`.
pub fn elevate(config: &Config, runner: &dyn CommandRunner, username: &str) -> CliResult<Value> {
    let manager = privileges(config, runner);
    manager.elevate(username);
    Ok(json!({ "username": username, "is_admin": manager.is_admin(username) }))
}

/// Remove from the admin group, then report membership as re-read from `dscl`.
pub fn demote(config: &Config, runner: &dyn CommandRunner, username: &str) -> CliResult<Value> {
    let manager = privileges(config, runner);
    manager.demote(username);
    Ok(json!({ "username": username, "is_admin": manager.is_admin(username) }))
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use crate::bootstrap::{ESCROWED_MARKER, PREFLIGHT_SUCCESS_MARKER, SUPPORTED_MARKER};
    use crate::probe::fake::ScriptedRunner;
    use crate::probe::CommandOutput;
    use std::fs;
    use std::net::TcpListener;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const PROFILES: &str = "/usr/bin/profiles";
    const MDMCLIENT: &str = "/usr/libexec/mdmclient";
    const DSCL: &str = "/usr/bin/dscl";

    fn profiles_status(text: &str) -> ScriptedRunner {
        ScriptedRunner::new().respond(PROFILES, "status", CommandOutput::new(text, 0))
    }

    fn cli(command: Command, config: Option<PathBuf>) -> Cli {
        Cli { config, command }
    }

    fn create_config(temp_dir: &TempDir, content: &str) -> PathBuf {
        let path = temp_dir.path().join("bootstrap-escrow.json");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_invoke_escrows_with_request_credentials() {
        let runner = profiles_status(SUPPORTED_MARKER)
            .respond(PROFILES, "install", CommandOutput::new("", 0));
        let request = Ok(json!({"username": "alice", "password": "hunter2"}));

        let data = invoke(&Config::default(), &runner, request).unwrap();

        assert_eq!(data["decision"], "allow");
        assert_eq!(data["reason"], "escrow_attempted");
        assert_eq!(data["outcome"]["success"], true);
        assert_eq!(runner.count(PROFILES, "install"), 1);
    }

    #[test]
    fn test_invoke_unreadable_request_still_allows() {
        let runner = profiles_status(SUPPORTED_MARKER);
        let request = Err(CliError::io_error("Empty input"));

        let data = invoke(&Config::default(), &runner, request).unwrap();

        assert_eq!(data["decision"], "allow");
        assert_eq!(data["reason"], "missing_credentials");
        assert_eq!(runner.count(PROFILES, "install"), 0);
    }

    #[test]
    fn test_invoke_escrowed_and_valid() {
        let runner = profiles_status(&format!("{}\n{}\n", SUPPORTED_MARKER, ESCROWED_MARKER))
            .respond(
                MDMCLIENT,
                "QueryDeviceInformation",
                CommandOutput::new(PREFLIGHT_SUCCESS_MARKER, 0),
            );
        let request = Ok(json!({"username": "alice", "password": "hunter2"}));

        let data = invoke(&Config::default(), &runner, request).unwrap();

        assert_eq!(data["reason"], "escrowed_and_valid");
        assert_eq!(data["valid"], true);
    }

    #[test]
    fn test_invoke_all_tools_missing_allows() {
        let runner = ScriptedRunner::new();
        let data = invoke(&Config::default(), &runner, Ok(json!({}))).unwrap();
        assert_eq!(data["decision"], "allow");
        assert_eq!(data["reason"], "not_supported");
    }

    #[test]
    fn test_status_and_validity() {
        let runner = profiles_status(SUPPORTED_MARKER);
        let data = status(&Config::default(), &runner).unwrap();
        assert_eq!(data, json!({"supported": true, "escrowed": false}));

        // mdmclient unscripted: launch failure reads as not valid
        let data = validity(&Config::default(), &runner).unwrap();
        assert_eq!(data, json!({"valid": false}));
    }

    #[test]
    fn test_endpoint() {
        let runner = ScriptedRunner::new().respond(
            MDMCLIENT,
            "DumpManagementStatus",
            CommandOutput::new(r#"ServerURL = "https://mdm.example.com:8443/mdm";"#, 0),
        );
        let data = endpoint(&Config::default(), &runner).unwrap();
        assert_eq!(data["endpoint"]["fqdn"], "mdm.example.com");
        assert_eq!(data["endpoint"]["port"], 8443);

        let data = endpoint(&Config::default(), &ScriptedRunner::new()).unwrap();
        assert_eq!(data, json!({"endpoint": null}));
    }

    #[test]
    fn test_reachable_without_endpoint_is_error() {
        let result = reachable(&Config::default(), &ScriptedRunner::new(), None, 443);
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::EndpointUnavailable);
    }

    #[test]
    fn test_reachable_explicit_host() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let data = reachable(
            &Config::default(),
            &ScriptedRunner::new(),
            Some("127.0.0.1"),
            port,
        )
        .unwrap();

        assert_eq!(data["reachable"], true);
        assert_eq!(data["endpoint"]["port"], port);
    }

    #[test]
    fn test_membership_commands() {
        let runner = ScriptedRunner::new().respond(
            DSCL,
            ".",
            CommandOutput::new("GroupMembership: root alice\n", 0),
        );

        let data = is_admin(&Config::default(), &runner, "alice").unwrap();
        assert_eq!(data, json!({"username": "alice", "is_admin": true}));

        let data = elevate(&Config::default(), &runner, "alice").unwrap();
        assert_eq!(data["is_admin"], true);

        // The scripted membership never changes, so demote re-reads a member
        let data = demote(&Config::default(), &runner, "alice").unwrap();
        assert_eq!(data["is_admin"], true);

        let calls = runner.calls();
        assert_eq!(calls[1].1[1], "append");
        assert_eq!(calls[3].1[1], "delete");
    }

    #[test]
    fn test_membership_uses_configured_group() {
        let runner = ScriptedRunner::new().respond(DSCL, ".", CommandOutput::new("carol", 0));
        let config = Config {
            admin_group: "/Groups/staff".to_string(),
            ..Config::default()
        };
        is_admin(&config, &runner, "carol").unwrap();
        assert_eq!(runner.calls()[0].1[2], "/Groups/staff");
    }

    #[test]
    fn test_bad_config_fails_non_invoke_commands() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_config(&temp_dir, r#"{"profiles_path": "profiles"}"#);

        let result = load_config(&cli(Command::Status, Some(path)));
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_bad_config_falls_back_for_invoke() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_config(&temp_dir, "not json");

        let config = load_config(&cli(Command::Invoke, Some(path))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_no_config_means_defaults() {
        let config = load_config(&cli(Command::Endpoint, None)).unwrap();
        assert_eq!(config, Config::default());
    }
}
