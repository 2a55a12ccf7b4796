//! Scalable File Storage commands.

pub mod export_policy;
pub mod resource_pool;
pub mod share;
pub mod snapshot;

use std::time::Duration;

use crate::builder::CommandNode;
use crate::flags::FlagSpec;
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, label_or};
use crate::waiter::{Terminal, WaitOptions};

pub(crate) const RESOURCE_POOL_FLAG: &str = "resource-pool-id";

/// The `beta sfs` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("sfs", "Provides functionality for SFS (Scalable File Storage)")
        .long_about("Manage resource pools, shares, export policies and snapshots of the Scalable File Storage.")
        .child(resource_pool::command())
        .child(share::command())
        .child(export_policy::command())
        .child(snapshot::command())
}

pub(crate) fn resource_pool_flag() -> FlagSpec {
    FlagSpec::identifier(RESOURCE_POOL_FLAG, "ID of the resource pool").required()
}

/// Polling schedule for SFS resources. Pools take minutes to provision.
pub(crate) fn wait_options() -> WaitOptions {
    WaitOptions::default()
        .with_intervals(Duration::from_secs(2), Duration::from_secs(30))
        .with_deadline(Duration::from_secs(30 * 60))
}

/// Terminal states of a resource pool or share after a creation or update.
pub(crate) fn sfs_state(state: &str) -> Terminal {
    match state {
        "created" => Terminal::Success,
        "error" => Terminal::Failure("resource entered state \"error\"".to_owned()),
        "" => Terminal::pending("unknown"),
        other => Terminal::pending(other),
    }
}

/// Name of a resource pool, or its ID if the lookup fails.
pub(crate) async fn pool_label(ctx: &Context, globals: &GlobalFlags, pool_id: &str) -> String {
    let request = ctx.clients.sfs.get_resource_pool(globals.project(), &globals.region, pool_id);
    label_or(ctx, "resource pool", pool_id, async move {
        request
            .execute()
            .await
            .map(|r| r.resource_pool.map(|p| p.name).unwrap_or_default())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("pending" => Terminal::pending("pending"); "pending")]
    #[test_case("creating" => Terminal::pending("creating"); "creating")]
    #[test_case("updating" => Terminal::pending("updating"); "updating")]
    #[test_case("" => Terminal::pending("unknown"); "no state yet")]
    #[test_case("created" => Terminal::Success; "created")]
    #[test_case("error" => Terminal::Failure("resource entered state \"error\"".into()); "error")]
    fn states(state: &str) -> Terminal {
        sfs_state(state)
    }

    #[test]
    fn pool_flag_is_a_required_identifier() {
        let flag = resource_pool_flag();
        assert!(flag.required);
        assert_eq!(flag.kind, crate::flags::FlagKind::Identifier);
    }
}
