//! `beta sfs snapshot`: point-in-time copies of a resource pool, addressed by name.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::sfs::{CreateSnapshotPayload, Snapshot, SnapshotList, SnapshotResponse};
use stackit_sdk::{NoContent, Request};

use super::{RESOURCE_POOL_FLAG, pool_label, resource_pool_flag};
use crate::builder::CommandNode;
use crate::commands::delete_prompt;
use crate::error::{RemoteExt, Result};
use crate::flags::{ArgSpec, FlagSpec};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation};
use crate::printer::Printer;
use crate::table::{Cell, Table};

const SNAPSHOT_NAME: &str = "SNAPSHOT_NAME";

/// The `snapshot` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("snapshot", "Manage SFS resource pool snapshots")
        .child(
            CommandNode::leaf("create", "Creates a snapshot of a resource pool", Create)
                .example(
                    "Create a snapshot",
                    "stackit beta sfs snapshot create --resource-pool-id xxx --name nightly",
                )
                .example(
                    "Create a snapshot with a comment",
                    "stackit beta sfs snapshot create --resource-pool-id xxx --name nightly --comment \"before upgrade\"",
                )
                .flag(resource_pool_flag())
                .flag(FlagSpec::string("name", "Name of the snapshot").required())
                .flag(FlagSpec::string("comment", "Comment of the snapshot")),
        )
        .child(
            CommandNode::leaf("delete", "Deletes a snapshot", Delete)
                .example(
                    "Delete a snapshot",
                    "stackit beta sfs snapshot delete nightly --resource-pool-id xxx",
                )
                .arg(ArgSpec::identifier(SNAPSHOT_NAME))
                .flag(resource_pool_flag()),
        )
        .child(
            CommandNode::leaf("describe", "Describes a snapshot", Describe)
                .example(
                    "Describe a snapshot",
                    "stackit beta sfs snapshot describe nightly --resource-pool-id xxx",
                )
                .arg(ArgSpec::identifier(SNAPSHOT_NAME))
                .flag(resource_pool_flag()),
        )
        .child(
            CommandNode::leaf("list", "Lists all snapshots of a resource pool", List)
                .example(
                    "List all snapshots of a resource pool",
                    "stackit beta sfs snapshot list --resource-pool-id xxx",
                )
                .flag(resource_pool_flag()),
        )
}

/// Input of `snapshot create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    resource_pool_id: String,
    #[serde(flatten)]
    payload: CreateSnapshotPayload,
}

/// `snapshot create`. Snapshots are available on return.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = CreateInput;
    type Labels = String;
    type Request = Request<CreateSnapshotPayload, SnapshotResponse>;
    type Response = SnapshotResponse;

    fn parse(&self, inv: &Invocation) -> Result<CreateInput> {
        Ok(CreateInput {
            globals: inv.globals.clone(),
            resource_pool_id: inv.flags.required_identifier(RESOURCE_POOL_FLAG)?,
            payload: CreateSnapshotPayload {
                name: inv.flags.required_string("name")?,
                comment: inv.flags.string("comment")?,
            },
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &CreateInput) -> String {
        pool_label(ctx, &input.globals, &input.resource_pool_id).await
    }

    fn confirmation(&self, _input: &CreateInput, pool: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to create a snapshot for resource pool \"{pool}\"?"
        ))
    }

    fn build_request(&self, ctx: &Context, input: &CreateInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .sfs
            .create_snapshot(input.globals.project(), &input.globals.region, &input.resource_pool_id)
            .payload(input.payload.clone()))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &CreateInput, request: Self::Request) -> Result<SnapshotResponse> {
        request.execute().await.remote("create snapshot")
    }

    fn render(&self, printer: &Printer, input: &CreateInput, pool: &String, response: &SnapshotResponse) -> Result<()> {
        printer.result(response, |p| {
            p.outputln(&format!(
                "Created snapshot \"{}\" for resource pool \"{pool}\"",
                input.payload.name
            ))
        })
    }
}

/// Input of the commands addressing one snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    resource_pool_id: String,
    snapshot_name: String,
}

impl SnapshotInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            resource_pool_id: inv.flags.required_identifier(RESOURCE_POOL_FLAG)?,
            snapshot_name: inv.arg(0)?.to_owned(),
        })
    }
}

/// `snapshot delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = SnapshotInput;
    type Labels = String;
    type Request = Request<(), NoContent>;
    type Response = NoContent;

    fn parse(&self, inv: &Invocation) -> Result<SnapshotInput> {
        SnapshotInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &SnapshotInput) -> String {
        pool_label(ctx, &input.globals, &input.resource_pool_id).await
    }

    fn confirmation(&self, input: &SnapshotInput, _pool: &String) -> Option<String> {
        Some(delete_prompt("snapshot", &input.snapshot_name))
    }

    fn build_request(&self, ctx: &Context, input: &SnapshotInput) -> Result<Self::Request> {
        Ok(ctx.clients.sfs.delete_snapshot(
            input.globals.project(),
            &input.globals.region,
            &input.resource_pool_id,
            &input.snapshot_name,
        ))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &SnapshotInput, request: Self::Request) -> Result<NoContent> {
        request.execute().await.remote("delete snapshot")
    }

    fn render(&self, printer: &Printer, input: &SnapshotInput, pool: &String, _response: &NoContent) -> Result<()> {
        printer.info(format_args!(
            "Deleted snapshot \"{}\" from resource pool \"{pool}\"",
            input.snapshot_name
        ));
        Ok(())
    }
}

/// `snapshot describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = SnapshotInput;
    type Labels = ();
    type Request = Request<(), SnapshotResponse>;
    type Response = SnapshotResponse;

    fn parse(&self, inv: &Invocation) -> Result<SnapshotInput> {
        SnapshotInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &SnapshotInput) -> Result<Self::Request> {
        Ok(ctx.clients.sfs.get_snapshot(
            input.globals.project(),
            &input.globals.region,
            &input.resource_pool_id,
            &input.snapshot_name,
        ))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &SnapshotInput, request: Self::Request) -> Result<SnapshotResponse> {
        request.execute().await.remote("describe snapshot")
    }

    fn render(&self, printer: &Printer, input: &SnapshotInput, _labels: &(), response: &SnapshotResponse) -> Result<()> {
        printer.result(response, |p| {
            let Some(snapshot) = &response.resource_pool_snapshot else {
                return p.outputln(&format!(
                    "Snapshot \"{}\" not found in resource pool \"{}\"",
                    input.snapshot_name, input.resource_pool_id
                ));
            };
            let mut table = Table::key_value();
            table
                .add_pair("NAME", &snapshot.name)
                .add_separator()
                .add_pair("COMMENT", snapshot.comment.as_deref())
                .add_separator()
                .add_pair("RESOURCE POOL ID", &snapshot.resource_pool_id)
                .add_separator()
                .add_pair("SIZE (GB)", snapshot.size_gigabytes)
                .add_separator()
                .add_pair("LOGICAL SIZE (GB)", snapshot.logical_size_gigabytes)
                .add_separator()
                .add_pair("CREATED AT", Cell::time(snapshot.created_at));
            p.output(&table.render())
        })
    }
}

/// Input of `snapshot list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    resource_pool_id: String,
}

/// `snapshot list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = ListInput;
    type Labels = ();
    type Request = Request<(), SnapshotList>;
    type Response = Vec<Snapshot>;

    fn parse(&self, inv: &Invocation) -> Result<ListInput> {
        Ok(ListInput {
            globals: inv.globals.clone(),
            resource_pool_id: inv.flags.required_identifier(RESOURCE_POOL_FLAG)?,
        })
    }

    fn build_request(&self, ctx: &Context, input: &ListInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .sfs
            .list_snapshots(input.globals.project(), &input.globals.region, &input.resource_pool_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ListInput, request: Self::Request) -> Result<Vec<Snapshot>> {
        Ok(request
            .execute()
            .await
            .remote("list snapshots")?
            .resource_pool_snapshots)
    }

    fn render(&self, printer: &Printer, input: &ListInput, _labels: &(), snapshots: &Vec<Snapshot>) -> Result<()> {
        printer.result(snapshots, |p| {
            if snapshots.is_empty() {
                p.info(format_args!(
                    "No snapshots found for resource pool \"{}\"",
                    input.resource_pool_id
                ));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["NAME", "COMMENT", "SIZE (GB)", "LOGICAL SIZE (GB)", "CREATED AT"]);
            for snapshot in snapshots {
                table.add_row([
                    Cell::from(&snapshot.name),
                    Cell::from(snapshot.comment.as_deref()),
                    Cell::from(snapshot.size_gigabytes),
                    Cell::from(snapshot.logical_size_gigabytes),
                    Cell::time(snapshot.created_at),
                ]);
            }
            p.output(&table.render())
        })
    }
}
