//! Configuration file
//!
//! Optional JSON document. Every field has a default, so `{}` is a valid
//! configuration and no file at all means defaults throughout.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event, Event};
use crate::privilege::ADMIN_GROUP;
use crate::probe::ToolPaths;

use super::errors::{CliError, CliResult};

/// Longest reachability timeout accepted, in milliseconds
const MAX_REACHABILITY_TIMEOUT_MS: u64 = 60_000;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `profiles` binary (optional, default /usr/bin/profiles)
    #[serde(default = "default_profiles_path")]
    pub profiles_path: PathBuf,

    /// `mdmclient` binary (optional, default /usr/libexec/mdmclient)
    #[serde(default = "default_mdmclient_path")]
    pub mdmclient_path: PathBuf,

    /// `dscl` binary (optional, default /usr/bin/dscl)
    #[serde(default = "default_dscl_path")]
    pub dscl_path: PathBuf,

    /// Group record holding local admins (optional, default /Groups/admin)
    #[serde(default = "default_admin_group")]
    pub admin_group: String,

    /// Reachability timeout in ms (optional, default 5000)
    #[serde(default = "default_reachability_timeout_ms")]
    pub reachability_timeout_ms: u64,

    /// Skip escrow when the management server is unreachable (default: false)
    #[serde(default)]
    pub require_reachable_server: bool,
}

fn default_profiles_path() -> PathBuf {
    ToolPaths::default().profiles
}
fn default_mdmclient_path() -> PathBuf {
    ToolPaths::default().mdmclient
}
fn default_dscl_path() -> PathBuf {
    ToolPaths::default().dscl
}
fn default_admin_group() -> String {
    ADMIN_GROUP.to_string()
}
fn default_reachability_timeout_ms() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles_path: default_profiles_path(),
            mdmclient_path: default_mdmclient_path(),
            dscl_path: default_dscl_path(),
            admin_group: default_admin_group(),
            reachability_timeout_ms: default_reachability_timeout_ms(),
            require_reachable_server: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        log_event(
            Event::ConfigLoaded,
            &[
                ("path", &path.display().to_string()),
                (
                    "require_reachable_server",
                    &config.require_reachable_server.to_string(),
                ),
            ],
        );
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        for (name, path) in [
            ("profiles_path", &self.profiles_path),
            ("mdmclient_path", &self.mdmclient_path),
            ("dscl_path", &self.dscl_path),
        ] {
            if !path.is_absolute() {
                return Err(CliError::config_error(format!(
                    "{} must be an absolute path, got '{}'",
                    name,
                    path.display()
                )));
            }
        }

        if !self.admin_group.starts_with("/Groups/") || self.admin_group.len() == "/Groups/".len() {
            return Err(CliError::config_error(format!(
                "Invalid admin_group: '{}'. Must name a record under /Groups/.",
                self.admin_group
            )));
        }

        if self.reachability_timeout_ms == 0
            || self.reachability_timeout_ms > MAX_REACHABILITY_TIMEOUT_MS
        {
            return Err(CliError::config_error(format!(
                "reachability_timeout_ms must be between 1 and {}",
                MAX_REACHABILITY_TIMEOUT_MS
            )));
        }

        Ok(())
    }

    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            profiles: self.profiles_path.clone(),
            mdmclient: self.mdmclient_path.clone(),
            dscl: self.dscl_path.clone(),
        }
    }

    pub fn reachability_timeout(&self) -> Duration {
        Duration::from_millis(self.reachability_timeout_ms)
    }
}
