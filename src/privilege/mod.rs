//! Local admin group membership
//!
//! Reads and edits the admin group's `GroupMembership` attribute through
//! `dscl`. Mutations are fire-and-log: a failed `dscl` run is logged and the
//! caller carries on. Re-check with [`PrivilegeManager::is_admin`] before
//! relying on the result.

use std::path::Path;

use crate::observability::{log_event, Event};
use crate::probe::{decoded_stdout, CommandRunner};

/// Group record edited by default
pub const ADMIN_GROUP: &str = "/Groups/admin";

const MEMBERSHIP_ATTRIBUTE: &str = "GroupMembership";

/// Queries and edits admin group membership.
pub struct PrivilegeManager<'a> {
    runner: &'a dyn CommandRunner,
    dscl: &'a Path,
    group: &'a str,
}

impl<'a> PrivilegeManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner, dscl: &'a Path) -> Self {
        Self {
            runner,
            dscl,
            group: ADMIN_GROUP,
        }
    }

    /// Operate on a different group record.
    pub fn with_group(mut self, group: &'a str) -> Self {
        self.group = group;
        self
    }

    /// Whether `username` appears in the group's membership list.
    ///
    /// Plain substring match against the `dscl` output, so a name contained
    /// in another member's name (`al` in `alice`) also matches.
    pub fn is_admin(&self, username: &str) -> bool {
        let output = match self
            .runner
            .run(self.dscl, &[".", "read", self.group, MEMBERSHIP_ATTRIBUTE])
        {
            Ok(output) => output,
            Err(_) => return false,
        };
        let Some(text) = decoded_stdout(self.dscl, &output) else {
            return false;
        };

        let is_admin = text.contains(username);
        log_event(
            Event::AdminMembershipChecked,
            &[
                ("username", username),
                ("group", self.group),
                ("is_admin", &is_admin.to_string()),
            ],
        );
        is_admin
    }

    /// Append `username` to the group.
    pub fn elevate(&self, username: &str) {
        self.edit("append", username, Event::ElevateComplete, Event::ElevateFailed);
    }

    /// Remove `username` from the group.
    pub fn demote(&self, username: &str) {
        self.edit("delete", username, Event::DemoteComplete, Event::DemoteFailed);
    }

    fn edit(&self, verb: &str, username: &str, done: Event, failed: Event) {
        let args = [".", verb, self.group, MEMBERSHIP_ATTRIBUTE, username];
        match self.runner.run(self.dscl, &args) {
            Ok(output) if output.success() => {
                log_event(done, &[("username", username), ("group", self.group)]);
            }
            Ok(output) => {
                log_event(
                    failed,
                    &[
                        ("username", username),
                        ("group", self.group),
                        ("exit_code", &output.exit_code.to_string()),
                        ("stderr", &output.stderr_lossy()),
                    ],
                );
            }
            Err(e) => {
                log_event(
                    failed,
                    &[
                        ("username", username),
                        ("group", self.group),
                        ("code", e.code()),
                        ("reason", &e.to_string()),
                    ],
                );
            }
        }
    }
}
