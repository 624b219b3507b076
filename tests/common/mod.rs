//! Shared test utilities
//!
//! `FakeRunner` stands in for the system tools: canned output keyed by
//! program and first argument, with every invocation recorded.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bootstrap_escrow::context::{MemoryHost, PASSWORD_KEY, USERNAME_KEY};
use bootstrap_escrow::probe::{CommandOutput, CommandRunner, ProbeError, ProbeResult, ToolPaths};

pub const SUPPORTED_ONLY: &str = "\
profiles: Bootstrap Token supported on server: YES
profiles: Bootstrap Token escrowed to server: NO
";

pub const SUPPORTED_AND_ESCROWED: &str = "\
profiles: Bootstrap Token supported on server: YES
profiles: Bootstrap Token escrowed to server: YES
";

pub const NOT_SUPPORTED: &str = "\
profiles: Bootstrap Token supported on server: NO
profiles: Bootstrap Token escrowed to server: NO
";

pub const PREFLIGHT_OK: &str = "\
Daemon response: {
    EACSPreflight = success;
    SupervisedDevice = 1;
}
";

pub const PREFLIGHT_FAILED: &str = "\
Daemon response: {
    EACSPreflight = \"EFI password exists\";
}
";

pub const MANAGEMENT_STATUS: &str = "\
Daemon response: {
    ServerURL = \"https://mdm.example.com:8443/mdm/connect\";
    CheckInURL = \"https://mdm.example.com:8443/mdm/checkin\";
}
";

#[derive(Default)]
pub struct FakeRunner {
    responses: HashMap<(PathBuf, String), CommandOutput>,
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, program: &Path, subcommand: &str, output: CommandOutput) -> Self {
        self.responses
            .insert((program.to_path_buf(), subcommand.to_string()), output);
        self
    }

    /// Canned `profiles status` and `mdmclient` replies
    pub fn device(tools: &ToolPaths, status: &str, preflight: &str) -> Self {
        Self::new()
            .respond(&tools.profiles, "status", CommandOutput::new(status, 0))
            .respond(
                &tools.mdmclient,
                "QueryDeviceInformation",
                CommandOutput::new(preflight, 0),
            )
            .respond(
                &tools.mdmclient,
                "DumpManagementStatus",
                CommandOutput::new(MANAGEMENT_STATUS, 0),
            )
    }

    pub fn escrow_exits(self, tools: &ToolPaths, exit_code: i32) -> Self {
        self.respond(
            &tools.profiles,
            "install",
            CommandOutput::new("", exit_code).with_stderr("profiles: install failed\n"),
        )
    }

    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, program: &Path, subcommand: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(p, args)| p == program && args.first().map(String::as_str) == Some(subcommand))
            .count()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &Path, args: &[&str]) -> ProbeResult<CommandOutput> {
        self.calls.lock().unwrap().push((
            program.to_path_buf(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        let key = (
            program.to_path_buf(),
            args.first().copied().unwrap_or_default().to_string(),
        );
        self.responses
            .get(&key)
            .cloned()
            .ok_or_else(|| ProbeError::Launch {
                program: program.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such tool"),
            })
    }
}

/// Host context as the login window supplies it: NUL-terminated values
pub fn login_host(username: &str, password: &str) -> MemoryHost {
    MemoryHost::new()
        .with_value(USERNAME_KEY, format!("{}\0", username).into_bytes())
        .with_value(PASSWORD_KEY, format!("{}\0", password).into_bytes())
}
