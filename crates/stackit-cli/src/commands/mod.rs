//! The command tree.
//!
//! ```text
//! stackit
//! ├── beta
//! │   ├── kms            keyring, key, version, wrapping-key
//! │   └── sfs            resource-pool, share, export-policy, snapshot
//! └── observability      instance, plans, grafana, scrape-config, credentials
//! ```

pub mod kms;
pub mod observability;
pub mod sfs;

#[cfg(test)]
pub(crate) mod testing;

use crate::app::BIN_NAME;
use crate::builder::CommandNode;
use crate::error::CliError;

/// Builds the full command tree.
#[must_use]
pub fn root() -> CommandNode {
    CommandNode::branch(BIN_NAME, "Manage STACKIT cloud services")
        .long_about("Manage STACKIT KMS, SFS and Observability resources from the command line.")
        .child(
            CommandNode::branch("beta", "Commands for services in beta")
                .long_about("Contains commands for services that are still in beta. Their behavior may change.")
                .child(kms::command())
                .child(sfs::command()),
        )
        .child(observability::command())
}

/// Verb of a creation message.
pub(crate) const fn created(async_mode: bool) -> &'static str {
    if async_mode { "Triggered creation of" } else { "Created" }
}

/// Verb of an update message.
pub(crate) const fn updated(async_mode: bool) -> &'static str {
    if async_mode { "Triggered update of" } else { "Updated" }
}

/// Verb of a deletion message.
pub(crate) const fn deleted(async_mode: bool) -> &'static str {
    if async_mode { "Triggered deletion of" } else { "Deleted" }
}

/// Prompt for irreversible deletions.
pub(crate) fn delete_prompt(what: &str, label: &str) -> String {
    format!("Are you sure you want to delete {what} \"{label}\"? (This cannot be undone)")
}

/// The API accepted a creation but returned no identifier.
pub(crate) fn missing_id(operation: &str, what: &str) -> CliError {
    CliError::OperationFailed {
        operation: operation.to_owned(),
        reason: format!("API call succeeded but returned an invalid response (missing {what} ID)"),
    }
    .after_dispatch()
}

/// Returns `id` unless it is empty.
pub(crate) fn require_id(id: &str, operation: &str, what: &str) -> crate::error::Result<String> {
    if id.is_empty() {
        Err(missing_id(operation, what))
    } else {
        Ok(id.to_owned())
    }
}
