//! bootstrap-escrow - login-time bootstrap token escrow
//!
//! Runs while a user logs in: checks whether the management server supports
//! and holds a usable bootstrap token, escrows one with the user's
//! credentials when it does not, and always lets the login proceed.

pub mod bootstrap;
pub mod cli;
pub mod context;
pub mod escrow;
pub mod observability;
pub mod privilege;
pub mod probe;
pub mod reachability;
