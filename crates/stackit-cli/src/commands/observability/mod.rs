//! Observability commands.

pub mod credentials;
pub mod grafana;
pub mod instance;
pub mod plans;
pub mod scrape_config;

use std::time::Duration;

use crate::builder::CommandNode;
use crate::flags::FlagSpec;
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, label_or};
use crate::waiter::{Terminal, WaitOptions};

pub(crate) const INSTANCE_FLAG: &str = "instance-id";

/// The `observability` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("observability", "Provides functionality for Observability")
        .long_about("Manage Observability instances, their Grafana settings, scrape configurations and credentials.")
        .child(instance::command())
        .child(plans::command())
        .child(grafana::command())
        .child(scrape_config::command())
        .child(credentials::command())
}

pub(crate) fn instance_flag() -> FlagSpec {
    FlagSpec::uuid(INSTANCE_FLAG, "ID of the Observability instance").required()
}

/// Polling schedule for instances. Provisioning takes several minutes.
pub(crate) fn wait_options() -> WaitOptions {
    WaitOptions::default()
        .with_intervals(Duration::from_secs(5), Duration::from_secs(30))
        .with_deadline(Duration::from_secs(45 * 60))
}

/// Maps an instance status to a wait outcome.
///
/// Statuses are `<OPERATION>_<PHASE>`, e.g. `CREATE_SUCCEEDED`. Only the
/// phase matters: the server reports the last operation it ran.
pub(crate) fn instance_state(status: &str, error: Option<&str>) -> Terminal {
    if status.ends_with("_SUCCEEDED") {
        Terminal::Success
    } else if status.ends_with("_FAILED") {
        Terminal::Failure(match error {
            Some(error) if !error.is_empty() => error.to_owned(),
            _ => format!("instance entered status {status:?}"),
        })
    } else if status.is_empty() {
        Terminal::pending("unknown")
    } else {
        Terminal::pending(status)
    }
}

/// Name of an instance, or its ID if the lookup fails.
pub(crate) async fn instance_label(ctx: &Context, globals: &GlobalFlags, instance_id: &str) -> String {
    let request = ctx.clients.observability.get_instance(globals.project(), instance_id);
    label_or(ctx, "instance", instance_id, async move {
        request.execute().await.map(|instance| instance.name)
    })
    .await
}
