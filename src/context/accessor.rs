//! Typed reads from the host context
//!
//! Every failure collapses to "value absent". Nothing here can fail the
//! login; the caller decides what absence means.

use crate::observability::{log_event, Event};

use super::host::HostContext;

/// Context key carrying the login name
pub const USERNAME_KEY: &str = "username";

/// Context key carrying the login password
pub const PASSWORD_KEY: &str = "password";

/// Read-only view over a host context for one login attempt.
pub struct ContextAccessor<'a, H: HostContext + ?Sized> {
    host: &'a H,
}

impl<'a, H: HostContext + ?Sized> ContextAccessor<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    /// Raw bytes under `key`.
    ///
    /// `None` when the host reports an error, hands back no buffer, or the
    /// buffer is empty.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.host.get_value(key) {
            Ok(Some(bytes)) if bytes.is_empty() => {
                log_event(
                    Event::ContextValueUnavailable,
                    &[("key", key), ("reason", "empty value")],
                );
                None
            }
            Ok(Some(bytes)) => Some(bytes),
            Ok(None) => {
                log_event(
                    Event::ContextValueUnavailable,
                    &[("key", key), ("reason", "no buffer")],
                );
                None
            }
            Err(e) => {
                log_event(
                    Event::ContextValueUnavailable,
                    &[("key", key), ("code", e.code()), ("reason", &e.to_string())],
                );
                None
            }
        }
    }

    /// Login name, NUL bytes stripped.
    pub fn username(&self) -> Option<String> {
        self.text(USERNAME_KEY)
    }

    /// Login password, NUL bytes stripped.
    pub fn password(&self) -> Option<String> {
        self.text(PASSWORD_KEY)
    }

    fn text(&self, key: &str) -> Option<String> {
        let bytes = self.get(key)?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                log_event(
                    Event::ContextValueUnavailable,
                    &[("key", key), ("reason", "not utf-8")],
                );
                return None;
            }
        };
        let text = text.replace('\0', "");
        if text.is_empty() {
            log_event(
                Event::ContextValueUnavailable,
                &[("key", key), ("reason", "only NUL bytes")],
            );
            return None;
        }
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemoryHost;

    #[test]
    fn test_trailing_nul_is_stripped() {
        let host = MemoryHost::new()
            .with_value(USERNAME_KEY, b"alice\0".to_vec())
            .with_value(PASSWORD_KEY, b"pa\0ss\0\0".to_vec());
        let accessor = ContextAccessor::new(&host);

        assert_eq!(accessor.username().as_deref(), Some("alice"));
        assert_eq!(accessor.password().as_deref(), Some("pass"));
    }

    #[test]
    fn test_missing_key_is_absent() {
        let host = MemoryHost::new();
        let accessor = ContextAccessor::new(&host);
        assert_eq!(accessor.get(USERNAME_KEY), None);
        assert_eq!(accessor.username(), None);
    }

    #[test]
    fn test_empty_value_is_absent() {
        let host = MemoryHost::new().with_value(PASSWORD_KEY, Vec::new());
        let accessor = ContextAccessor::new(&host);
        assert_eq!(accessor.get(PASSWORD_KEY), None);
    }

    #[test]
    fn test_only_nul_is_absent() {
        let host = MemoryHost::new().with_value(USERNAME_KEY, b"\0".to_vec());
        let accessor = ContextAccessor::new(&host);
        assert_eq!(accessor.get(USERNAME_KEY), Some(vec![0]));
        assert_eq!(accessor.username(), None);
    }

    #[test]
    fn test_invalid_utf8_is_absent() {
        let host = MemoryHost::new().with_value(USERNAME_KEY, vec![0xff, 0xfe, b'a']);
        let accessor = ContextAccessor::new(&host);
        assert_eq!(accessor.username(), None);
    }

    #[test]
    fn test_host_error_is_absent() {
        let host = MemoryHost::new()
            .with_value(PASSWORD_KEY, "secret")
            .with_failing_key(PASSWORD_KEY);
        let accessor = ContextAccessor::new(&host);
        assert_eq!(accessor.password(), None);
    }

    #[test]
    fn test_works_through_trait_object() {
        let host = MemoryHost::new().with_value(USERNAME_KEY, "bob");
        let dyn_host: &dyn HostContext = &host;
        let accessor = ContextAccessor::new(dyn_host);
        assert_eq!(accessor.username().as_deref(), Some("bob"));
    }
}
