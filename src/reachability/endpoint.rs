//! Management server endpoint discovery

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use url::{Host, Url};

use crate::observability::{log_event, Event};
use crate::probe::{decoded_stdout, log_exit_status, CommandRunner};

/// Port assumed when the server URL does not name one
pub const DEFAULT_PORT: u16 = 443;

/// `ServerURL = "..."` assignment in `mdmclient DumpManagementStatus` output
const SERVER_URL_PATTERN: &str = r#"ServerURL = "(https?://[^"]+)""#;

fn server_url_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(SERVER_URL_PATTERN).ok()).as_ref()
}

/// Host and port of the management server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerEndpoint {
    pub fqdn: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(fqdn: impl Into<String>, port: u16) -> Self {
        Self {
            fqdn: fqdn.into(),
            port,
        }
    }

    /// Parse the first `ServerURL` assignment in management status text.
    pub fn from_management_status(output: &str) -> Option<Self> {
        let captures = server_url_regex()?.captures(output)?;
        let raw = captures.get(1)?.as_str();
        Self::from_url(raw)
    }

    /// Host and port of a server URL; `None` if it is malformed or hostless.
    pub fn from_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        let fqdn = match url.host()? {
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };
        if fqdn.is_empty() {
            return None;
        }
        let port = match url.port() {
            Some(port) => port,
            // `Url` hides an explicit port equal to the scheme default
            None if authority_has_port(raw) => url.port_or_known_default()?,
            None => DEFAULT_PORT,
        };
        Some(Self { fqdn, port })
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fqdn.contains(':') {
            write!(f, "[{}]:{}", self.fqdn, self.port)
        } else {
            write!(f, "{}:{}", self.fqdn, self.port)
        }
    }
}

fn authority_has_port(raw: &str) -> bool {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let authority = rest.split(&['/', '?', '#'][..]).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let after_host = host_port.rsplit_once(']').map_or(host_port, |(_, tail)| tail);
    after_host.contains(':')
}

/// Reads the management server endpoint from `mdmclient DumpManagementStatus`.
pub struct EndpointResolver<'a> {
    runner: &'a dyn CommandRunner,
    mdmclient: &'a Path,
}

impl<'a> EndpointResolver<'a> {
    pub fn new(runner: &'a dyn CommandRunner, mdmclient: &'a Path) -> Self {
        Self { runner, mdmclient }
    }

    pub fn server_endpoint(&self) -> Option<ServerEndpoint> {
        let output = self
            .runner
            .run(self.mdmclient, &["DumpManagementStatus"])
            .ok()?;
        if !output.success() {
            log_exit_status(self.mdmclient, &output);
            return None;
        }
        let text = decoded_stdout(self.mdmclient, &output)?;

        match ServerEndpoint::from_management_status(text) {
            Some(endpoint) => {
                log_event(
                    Event::EndpointResolved,
                    &[
                        ("fqdn", &endpoint.fqdn),
                        ("port", &endpoint.port.to_string()),
                    ],
                );
                Some(endpoint)
            }
            None => {
                log_event(
                    Event::EndpointUnavailable,
                    &[("reason", "no parsable ServerURL")],
                );
                None
            }
        }
    }
}
