//! Host capability
//!
//! The authentication host owns the per-login key/value context and the
//! final decision. This crate sees it only through [`HostContext`].

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Errors reported by the host integration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The host returned a non-success status for a call
    #[error("host call failed with status {0}")]
    Status(i32),

    /// The host is no longer accepting calls for this login attempt
    #[error("host context is closed")]
    Closed,
}

impl HostError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            HostError::Status(_) => "BB_HOST_STATUS",
            HostError::Closed => "BB_HOST_CLOSED",
        }
    }
}

/// Decision delivered to the host.
///
/// Only `Allow` is ever produced here; `Deny` exists because the host's
/// result channel carries it, and denial is the host's own business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

/// Narrow capability over the host's authorization engine.
pub trait HostContext {
    /// Raw value stored under `key`.
    ///
    /// `Ok(None)` means the host answered but handed back no buffer.
    fn get_value(&self, key: &str) -> HostResult<Option<Vec<u8>>>;

    /// Deliver the terminal decision for this login attempt.
    fn set_result(&self, decision: Decision) -> HostResult<()>;
}

/// In-memory host used by the CLI and tests.
#[derive(Debug, Default)]
pub struct MemoryHost {
    values: HashMap<String, Vec<u8>>,
    failing_keys: Vec<String>,
    decision: Mutex<Option<Decision>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Make lookups of `key` fail with a host status error.
    pub fn with_failing_key(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.push(key.into());
        self
    }

    /// Build a host from a JSON request object.
    ///
    /// Every string member becomes a context value holding its UTF-8 bytes;
    /// other members are ignored.
    pub fn from_request(request: &Value) -> Self {
        let mut host = Self::new();
        if let Some(object) = request.as_object() {
            for (key, value) in object {
                if let Some(text) = value.as_str() {
                    host.values.insert(key.clone(), text.as_bytes().to_vec());
                }
            }
        }
        host
    }

    /// The decision delivered so far, if any.
    pub fn decision(&self) -> Option<Decision> {
        self.decision.lock().ok().and_then(|guard| *guard)
    }
}

impl HostContext for MemoryHost {
    fn get_value(&self, key: &str) -> HostResult<Option<Vec<u8>>> {
        if self.failing_keys.iter().any(|k| k == key) {
            return Err(HostError::Status(-60008));
        }
        Ok(self.values.get(key).cloned())
    }

    fn set_result(&self, decision: Decision) -> HostResult<()> {
        let mut guard = self.decision.lock().map_err(|_| HostError::Closed)?;
        *guard = Some(decision);
        Ok(())
    }
}
