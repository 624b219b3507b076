//! Host context access
//!
//! The host supplies per-login values (username, password) and receives the
//! terminal decision. Access goes through the [`HostContext`] capability so
//! any host integration can be plugged in behind it.

mod accessor;
mod host;

pub use accessor::{ContextAccessor, PASSWORD_KEY, USERNAME_KEY};
pub use host::{Decision, HostContext, HostError, HostResult, MemoryHost};
