//! `beta sfs share`: file shares inside a resource pool.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::sfs::{CreateSharePayload, Share, ShareList, ShareResponse, UpdateSharePayload};
use stackit_sdk::{NoContent, Request};

use super::export_policy::rules_table;
use super::{RESOURCE_POOL_FLAG, pool_label, resource_pool_flag, sfs_state, wait_options};
use crate::builder::CommandNode;
use crate::commands::{created, delete_prompt, deleted, missing_id, updated};
use crate::error::{CliError, RemoteExt, Result};
use crate::flags::{ArgSpec, FlagKind, FlagSpec};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation, gone_on_not_found, label_or, poll};
use crate::printer::Printer;
use crate::table::{Cell, Table, render_tables};
use crate::waiter::{Terminal, WaitTarget};

const SHARE_ID: &str = "SHARE_ID";
const HARD_LIMIT_FLAG: &str = "hard-limit";
const EXPORT_POLICY_NAME_FLAG: &str = "export-policy-name";

fn hard_limit_flag() -> FlagSpec {
    FlagSpec::new(HARD_LIMIT_FLAG, FlagKind::NON_NEGATIVE, "Space hard limit of the share in gigabytes")
}

fn export_policy_name_flag() -> FlagSpec {
    FlagSpec::string(EXPORT_POLICY_NAME_FLAG, "Export policy the share is assigned to")
}

/// The `share` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("share", "Manage SFS shares")
        .child(
            CommandNode::leaf("create", "Creates an SFS share", Create)
                .example(
                    "Create a share with a hard limit of 100 GB",
                    "stackit beta sfs share create --name my-share --resource-pool-id xxx --hard-limit 100",
                )
                .example(
                    "Create a share with an export policy",
                    "stackit beta sfs share create --name my-share --resource-pool-id xxx --hard-limit 100 --export-policy-name my-policy",
                )
                .flag(FlagSpec::string("name", "Name of the share").required())
                .flag(resource_pool_flag())
                .flag(hard_limit_flag().required())
                .flag(export_policy_name_flag()),
        )
        .child(
            CommandNode::leaf("delete", "Deletes an SFS share", Delete)
                .example(
                    "Delete a share",
                    "stackit beta sfs share delete yyy --resource-pool-id xxx",
                )
                .arg(ArgSpec::identifier(SHARE_ID))
                .flag(resource_pool_flag()),
        )
        .child(
            CommandNode::leaf("describe", "Describes an SFS share", Describe)
                .example(
                    "Describe a share",
                    "stackit beta sfs share describe yyy --resource-pool-id xxx",
                )
                .arg(ArgSpec::identifier(SHARE_ID))
                .flag(resource_pool_flag()),
        )
        .child(
            CommandNode::leaf("list", "Lists all SFS shares of a resource pool", List)
                .example(
                    "List all shares of a resource pool",
                    "stackit beta sfs share list --resource-pool-id xxx",
                )
                .flag(resource_pool_flag()),
        )
        .child(
            CommandNode::leaf("update", "Updates an SFS share", Update)
                .example(
                    "Raise the hard limit of a share",
                    "stackit beta sfs share update yyy --resource-pool-id xxx --hard-limit 200",
                )
                .example(
                    "Assign another export policy",
                    "stackit beta sfs share update yyy --resource-pool-id xxx --export-policy-name other-policy",
                )
                .arg(ArgSpec::identifier(SHARE_ID))
                .flag(resource_pool_flag())
                .flag(hard_limit_flag())
                .flag(export_policy_name_flag()),
        )
}

/// Polls the share until `check` reports a terminal state.
async fn wait_share<C>(
    ctx: &Context,
    globals: &GlobalFlags,
    pool_id: &str,
    share_id: &str,
    target: &WaitTarget,
    check: C,
) -> Result<()>
where
    C: Fn(&Option<ShareResponse>) -> Terminal + Send,
{
    let sfs = &ctx.clients.sfs;
    poll(
        ctx,
        target,
        || {
            let request = sfs.get_share(globals.project(), &globals.region, pool_id, share_id);
            async move { gone_on_not_found(request.execute().await) }
        },
        check,
        &wait_options(),
    )
    .await?;
    Ok(())
}

fn settled(response: &Option<ShareResponse>) -> Terminal {
    match response.as_ref().and_then(|r| r.share.as_ref()) {
        Some(share) => sfs_state(&share.state),
        None => Terminal::pending("unknown"),
    }
}

/// Input of `share create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    name: String,
    resource_pool_id: String,
    hard_limit: i64,
    export_policy_name: Option<String>,
}

/// `share create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = CreateInput;
    type Labels = String;
    type Request = Request<CreateSharePayload, ShareResponse>;
    type Response = ShareResponse;

    fn parse(&self, inv: &Invocation) -> Result<CreateInput> {
        let flags = &inv.flags;
        Ok(CreateInput {
            globals: inv.globals.clone(),
            name: flags.required_string("name")?,
            resource_pool_id: flags.required_identifier(RESOURCE_POOL_FLAG)?,
            hard_limit: flags.required_int64(HARD_LIMIT_FLAG)?,
            export_policy_name: flags.string(EXPORT_POLICY_NAME_FLAG)?,
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &CreateInput) -> String {
        pool_label(ctx, &input.globals, &input.resource_pool_id).await
    }

    fn confirmation(&self, _input: &CreateInput, pool: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to create an SFS share for resource pool \"{pool}\"?"
        ))
    }

    fn build_request(&self, ctx: &Context, input: &CreateInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .sfs
            .create_share(input.globals.project(), &input.globals.region, &input.resource_pool_id)
            .payload(CreateSharePayload {
                name: input.name.clone(),
                space_hard_limit_gigabytes: input.hard_limit,
                export_policy_name: input.export_policy_name.clone(),
            }))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &CreateInput, request: Self::Request) -> Result<ShareResponse> {
        let response = request.execute().await.remote("create SFS share")?;
        match &response.share {
            Some(share) if !share.id.is_empty() => Ok(response),
            _ => Err(missing_id("create SFS share", "share")),
        }
    }

    fn waits(&self, _input: &CreateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &CreateInput, response: &ShareResponse) -> Result<()> {
        let share_id = response.share.as_ref().map(|s| s.id.as_str()).unwrap_or_default();
        let target = WaitTarget::new(format!("share {share_id}"), "wait for SFS share creation", "Creating share");
        wait_share(ctx, &input.globals, &input.resource_pool_id, share_id, &target, settled).await
    }

    fn render(&self, printer: &Printer, input: &CreateInput, pool: &String, response: &ShareResponse) -> Result<()> {
        printer.result(response, |p| {
            let Some(share) = &response.share else {
                return p.outputln("SFS share response is empty");
            };
            p.outputln(&format!(
                "{} SFS share \"{}\" in resource pool \"{pool}\".\nShare ID: {}",
                created(input.globals.async_mode),
                share.name,
                share.id
            ))
        })
    }
}

/// Input of the commands addressing one share.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    resource_pool_id: String,
    share_id: String,
}

impl ShareInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            resource_pool_id: inv.flags.required_identifier(RESOURCE_POOL_FLAG)?,
            share_id: inv.arg(0)?.to_owned(),
        })
    }

    fn get(&self, ctx: &Context) -> Request<(), ShareResponse> {
        ctx.clients.sfs.get_share(
            self.globals.project(),
            &self.globals.region,
            &self.resource_pool_id,
            &self.share_id,
        )
    }

    async fn share_label(&self, ctx: &Context) -> String {
        let request = self.get(ctx);
        label_or(ctx, "share", &self.share_id, async move {
            request
                .execute()
                .await
                .map(|r| r.share.map(|s| s.name).unwrap_or_default())
        })
        .await
    }
}

/// Names of a share and its pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareLabels {
    share: String,
    pool: String,
}

impl ShareLabels {
    async fn resolve(ctx: &Context, input: &ShareInput) -> Self {
        Self {
            share: input.share_label(ctx).await,
            pool: pool_label(ctx, &input.globals, &input.resource_pool_id).await,
        }
    }
}

/// `share delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = ShareInput;
    type Labels = ShareLabels;
    type Request = Request<(), NoContent>;
    type Response = NoContent;

    fn parse(&self, inv: &Invocation) -> Result<ShareInput> {
        ShareInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &ShareInput) -> ShareLabels {
        ShareLabels::resolve(ctx, input).await
    }

    fn confirmation(&self, _input: &ShareInput, labels: &ShareLabels) -> Option<String> {
        Some(delete_prompt("SFS share", &labels.share))
    }

    fn build_request(&self, ctx: &Context, input: &ShareInput) -> Result<Self::Request> {
        Ok(ctx.clients.sfs.delete_share(
            input.globals.project(),
            &input.globals.region,
            &input.resource_pool_id,
            &input.share_id,
        ))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ShareInput, request: Self::Request) -> Result<NoContent> {
        request.execute().await.remote("delete SFS share")
    }

    fn waits(&self, _input: &ShareInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &ShareInput, _response: &NoContent) -> Result<()> {
        let target = WaitTarget::new(
            format!("share {}", input.share_id),
            "wait for SFS share deletion",
            "Deleting share",
        );
        wait_share(
            ctx,
            &input.globals,
            &input.resource_pool_id,
            &input.share_id,
            &target,
            |response: &Option<ShareResponse>| match response.as_ref().and_then(|r| r.share.as_ref()) {
                None => Terminal::Success,
                Some(share) if share.state == "error" => {
                    Terminal::Failure("resource entered state \"error\"".to_owned())
                }
                Some(share) => Terminal::pending(if share.state.is_empty() { "deleting" } else { &share.state }),
            },
        )
        .await
    }

    fn render(&self, printer: &Printer, input: &ShareInput, labels: &ShareLabels, _response: &NoContent) -> Result<()> {
        printer.info(format_args!(
            "{} SFS share \"{}\" in resource pool \"{}\"",
            deleted(input.globals.async_mode),
            labels.share,
            labels.pool
        ));
        Ok(())
    }
}

/// `share describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = ShareInput;
    type Labels = ();
    type Request = Request<(), ShareResponse>;
    type Response = ShareResponse;

    fn parse(&self, inv: &Invocation) -> Result<ShareInput> {
        ShareInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &ShareInput) -> Result<Self::Request> {
        Ok(input.get(ctx))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ShareInput, request: Self::Request) -> Result<ShareResponse> {
        request.execute().await.remote("describe SFS share")
    }

    fn render(&self, printer: &Printer, input: &ShareInput, _labels: &(), response: &ShareResponse) -> Result<()> {
        printer.result(response, |p| match &response.share {
            Some(share) => p.output(&render_tables(&share_tables(share))),
            None => p.outputln(&format!(
                "Share \"{}\" not found in resource pool \"{}\"",
                input.share_id, input.resource_pool_id
            )),
        })
    }
}

/// The share, its export policy and the policy's rules.
fn share_tables(share: &Share) -> Vec<Table> {
    let mut tables = Vec::with_capacity(3);

    let mut table = Table::key_value();
    table
        .set_title("Share")
        .add_pair("ID", &share.id)
        .add_separator()
        .add_pair("NAME", &share.name)
        .add_separator()
        .add_pair("STATE", &share.state)
        .add_separator()
        .add_pair("MOUNT PATH", share.mount_path.as_deref())
        .add_separator()
        .add_pair("HARD LIMIT (GB)", share.space_hard_limit_gigabytes)
        .add_separator()
        .add_pair("CREATED AT", Cell::time(share.created_at));
    tables.push(table);

    let Some(policy) = &share.export_policy else {
        return tables;
    };
    let mut table = Table::new();
    table
        .set_title("Export Policy")
        .set_header(["ID", "NAME", "SHARES USING EXPORT POLICY", "CREATED AT"])
        .add_row([
            Cell::from(&policy.id),
            Cell::from(&policy.name),
            Cell::from(policy.shares_using_export_policy),
            Cell::time(policy.created_at),
        ]);
    tables.push(table);

    if !policy.rules.is_empty() {
        let mut rules = rules_table(&policy.rules);
        rules.set_title("Export Policy - Rules");
        tables.push(rules);
    }
    tables
}

/// Input of `share list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    resource_pool_id: String,
}

/// `share list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = ListInput;
    type Labels = ();
    type Request = Request<(), ShareList>;
    type Response = Vec<Share>;

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
            .list_shares(input.globals.project(), &input.globals.region, &input.resource_pool_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ListInput, request: Self::Request) -> Result<Vec<Share>> {
        Ok(request.execute().await.remote("list SFS shares")?.shares)
    }

    fn render(&self, printer: &Printer, input: &ListInput, _labels: &(), shares: &Vec<Share>) -> Result<()> {
        printer.result(shares, |p| {
            if shares.is_empty() {
                p.info(format_args!(
                    "No shares found for resource pool \"{}\"",
                    input.resource_pool_id
                ));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["ID", "NAME", "STATE", "EXPORT POLICY", "MOUNT PATH", "HARD LIMIT (GB)"]);
            for share in shares {
                table.add_row([
                    Cell::from(&share.id),
                    Cell::from(&share.name),
                    Cell::from(&share.state),
                    Cell::from(share.export_policy.as_ref().map(|p| p.name.as_str())),
                    Cell::from(share.mount_path.as_deref()),
                    Cell::from(share.space_hard_limit_gigabytes),
                ]);
            }
            p.output(&table.render())
        })
    }
}

/// Input of `share update`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInput {
    #[serde(flatten)]
    share: ShareInput,
    #[serde(flatten)]
    payload: UpdateSharePayload,
}

/// `share update`. Only the given fields are sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Update;

#[async_trait]
impl Operation for Update {
    type Input = UpdateInput;
    type Labels = ShareLabels;
    type Request = Request<UpdateSharePayload, ShareResponse>;
    type Response = ShareResponse;

    fn parse(&self, inv: &Invocation) -> Result<UpdateInput> {
        Ok(UpdateInput {
            share: ShareInput::parse(inv)?,
            payload: UpdateSharePayload {
                export_policy_name: inv.flags.string(EXPORT_POLICY_NAME_FLAG)?,
                space_hard_limit_gigabytes: inv.flags.int64(HARD_LIMIT_FLAG)?,
            },
        })
    }

    fn validate(&self, input: &UpdateInput) -> Result<()> {
        if input.payload.is_empty() {
            return Err(CliError::EmptyUpdate);
        }
        Ok(())
    }

    async fn resolve_labels(&self, ctx: &Context, input: &UpdateInput) -> ShareLabels {
        ShareLabels::resolve(ctx, &input.share).await
    }

    fn confirmation(&self, _input: &UpdateInput, labels: &ShareLabels) -> Option<String> {
        Some(format!(
            "Are you sure you want to update SFS share \"{}\" for resource pool \"{}\"?",
            labels.share, labels.pool
        ))
    }

    fn build_request(&self, ctx: &Context, input: &UpdateInput) -> Result<Self::Request> {
        let share = &input.share;
        Ok(ctx
            .clients
            .sfs
            .update_share(
                share.globals.project(),
                &share.globals.region,
                &share.resource_pool_id,
                &share.share_id,
            )
            .payload(input.payload.clone()))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &UpdateInput, request: Self::Request) -> Result<ShareResponse> {
        request.execute().await.remote("update SFS share")
    }

    fn waits(&self, _input: &UpdateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &UpdateInput, _response: &ShareResponse) -> Result<()> {
        let share = &input.share;
        let target = WaitTarget::new(
            format!("share {}", share.share_id),
            "wait for SFS share update",
            "Updating share",
        );
        wait_share(ctx, &share.globals, &share.resource_pool_id, &share.share_id, &target, settled).await
    }

    fn render(&self, printer: &Printer, input: &UpdateInput, labels: &ShareLabels, response: &ShareResponse) -> Result<()> {
        printer.result(response, |p| {
            let name = response
                .share
                .as_ref()
                .map(|s| s.name.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or(&labels.share);
            p.outputln(&format!(
                "{} SFS share \"{name}\" in resource pool \"{}\".",
                updated(input.share.globals.async_mode),
                labels.pool
            ))
        })
    }
}
