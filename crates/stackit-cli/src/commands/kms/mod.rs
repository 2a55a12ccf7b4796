//! Key Management Service commands.

pub mod key;
pub mod key_ring;
pub mod version;
pub mod wrapping_key;

use std::time::Duration;

use crate::builder::CommandNode;
use crate::flags::FlagSpec;
use crate::waiter::{Terminal, WaitOptions};

pub(crate) const KEY_RING_FLAG: &str = "key-ring";
pub(crate) const KEY_FLAG: &str = "key";

/// The `beta kms` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("kms", "Provides functionality for KMS")
        .long_about("Manage key rings, keys, key versions and wrapping keys of the Key Management Service.")
        .child(key_ring::command())
        .child(key::command())
        .child(version::command())
        .child(wrapping_key::command())
}

pub(crate) fn key_ring_flag() -> FlagSpec {
    FlagSpec::uuid(KEY_RING_FLAG, "ID of the KMS key ring")
        .required()
        .alias("keyring-id")
}

pub(crate) fn key_flag() -> FlagSpec {
    FlagSpec::uuid(KEY_FLAG, "ID of the KMS key").required().alias("key-id")
}

/// Polling schedule for KMS resources, which settle within seconds.
pub(crate) fn wait_options() -> WaitOptions {
    WaitOptions::default()
        .with_intervals(Duration::from_secs(1), Duration::from_secs(10))
        .with_deadline(Duration::from_secs(10 * 60))
}

/// Terminal states of a freshly created KMS resource.
///
/// Import-only keys have no material until a version is imported, so they
/// settle in `version_not_ready`.
pub(crate) fn creation_state(state: &str, import_only: bool) -> Terminal {
    match state {
        "" | "creating" => Terminal::pending(if state.is_empty() { "unknown" } else { state }),
        "active" => Terminal::Success,
        "version_not_ready" if import_only => Terminal::Success,
        other => Terminal::Failure(format!("resource entered state {other:?}")),
    }
}
