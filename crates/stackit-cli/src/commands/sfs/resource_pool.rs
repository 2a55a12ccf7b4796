//! `beta sfs resource-pool`: storage capacity shared by shares.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::sfs::{
    CreateResourcePoolPayload, PERFORMANCE_CLASSES, ResourcePool, ResourcePoolList, ResourcePoolResponse,
    UpdateResourcePoolPayload,
};
use stackit_sdk::{NoContent, Request};

use super::{pool_label, sfs_state, wait_options};
use crate::builder::CommandNode;
use crate::commands::{created, delete_prompt, deleted, missing_id, updated};
use crate::error::{CliError, RemoteExt, Result};
use crate::flags::{ArgSpec, FlagKind, FlagSpec};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation, gone_on_not_found, poll, project_label};
use crate::printer::Printer;
use crate::table::{Cell, Table};
use crate::waiter::{FetchError, Terminal, WaitTarget};

const RESOURCE_POOL_ID: &str = "RESOURCE_POOL_ID";
const SIZE_FLAG: &str = "size";
const PERFORMANCE_CLASS_FLAG: &str = "performance-class";
const IP_ACL_FLAG: &str = "ip-acl";
const SNAPSHOTS_VISIBLE_FLAG: &str = "snapshots-visible";

fn performance_class_flag() -> FlagSpec {
    FlagSpec::enumeration(PERFORMANCE_CLASS_FLAG, PERFORMANCE_CLASSES, "Performance class")
}

fn size_flag() -> FlagSpec {
    FlagSpec::new(SIZE_FLAG, FlagKind::NON_NEGATIVE, "Size of the pool in gigabytes")
}

fn ip_acl_flag() -> FlagSpec {
    FlagSpec::new(
        IP_ACL_FLAG,
        FlagKind::CidrList,
        "Networks allowed to mount the pool, e.g. 192.168.10.0/24; comma separated or repeated",
    )
}

fn snapshots_visible_flag() -> FlagSpec {
    FlagSpec::bool(SNAPSHOTS_VISIBLE_FLAG, "Make snapshots visible and accessible to users")
}

/// The `resource-pool` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("resource-pool", "Manage SFS resource pools")
        .child(
            CommandNode::leaf("create", "Creates an SFS resource pool", Create)
                .example(
                    "Create a resource pool",
                    "stackit beta sfs resource-pool create --name my-pool --availability-zone eu01-m --performance-class Standard --size 500 --ip-acl 10.0.0.0/24",
                )
                .example(
                    "Create a resource pool with visible snapshots",
                    "stackit beta sfs resource-pool create --name my-pool --availability-zone eu01-m --performance-class Premium --size 500 --ip-acl 10.0.0.0/24,10.1.0.0/24 --snapshots-visible",
                )
                .flag(FlagSpec::string("name", "Name of the resource pool").required())
                .flag(FlagSpec::string("availability-zone", "Availability zone").required())
                .flag(performance_class_flag().required())
                .flag(size_flag().required())
                .flag(ip_acl_flag().required())
                .flag(snapshots_visible_flag()),
        )
        .child(
            CommandNode::leaf("delete", "Deletes an SFS resource pool", Delete)
                .example(
                    "Delete a resource pool",
                    "stackit beta sfs resource-pool delete xxx",
                )
                .arg(ArgSpec::identifier(RESOURCE_POOL_ID)),
        )
        .child(
            CommandNode::leaf("describe", "Describes an SFS resource pool", Describe)
                .example(
                    "Describe a resource pool",
                    "stackit beta sfs resource-pool describe xxx",
                )
                .arg(ArgSpec::identifier(RESOURCE_POOL_ID)),
        )
        .child(
            CommandNode::leaf("list", "Lists all SFS resource pools", List)
                .example("List all resource pools", "stackit beta sfs resource-pool list")
                .example(
                    "List all resource pools in YAML format",
                    "stackit beta sfs resource-pool list --output-format yaml",
                ),
        )
        .child(
            CommandNode::leaf("update", "Updates an SFS resource pool", Update)
                .example(
                    "Grow a resource pool",
                    "stackit beta sfs resource-pool update xxx --size 1000",
                )
                .example(
                    "Replace the IP ACL of a resource pool",
                    "stackit beta sfs resource-pool update xxx --ip-acl 10.2.0.0/24",
                )
                .arg(ArgSpec::identifier(RESOURCE_POOL_ID))
                .flag(performance_class_flag())
                .flag(size_flag())
                .flag(ip_acl_flag())
                .flag(snapshots_visible_flag()),
        )
}

/// Polls the pool until it settles.
async fn wait_settled(ctx: &Context, globals: &GlobalFlags, pool_id: &str, operation: &str, message: &str) -> Result<()> {
    let target = WaitTarget::new(format!("resource pool {pool_id}"), operation, message);
    let sfs = &ctx.clients.sfs;
    poll(
        ctx,
        &target,
        || {
            let request = sfs.get_resource_pool(globals.project(), &globals.region, pool_id);
            async move { request.execute().await.map_err(FetchError::from) }
        },
        |response: &ResourcePoolResponse| {
            response
                .resource_pool
                .as_ref()
                .map_or_else(|| Terminal::pending("unknown"), |pool| sfs_state(&pool.state))
        },
        &wait_options(),
    )
    .await?;
    Ok(())
}

/// Input of `resource-pool create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    name: String,
    availability_zone: String,
    performance_class: &'static str,
    size_gigabytes: i64,
    ip_acl: Vec<String>,
    snapshots_visible: Option<bool>,
}

/// `resource-pool create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = CreateInput;
    type Labels = String;
    type Request = Request<CreateResourcePoolPayload, ResourcePoolResponse>;
    type Response = ResourcePoolResponse;

    fn parse(&self, inv: &Invocation) -> Result<CreateInput> {
        let flags = &inv.flags;
        Ok(CreateInput {
            globals: inv.globals.clone(),
            name: flags.required_string("name")?,
            availability_zone: flags.required_string("availability-zone")?,
            performance_class: flags.required_enumeration(PERFORMANCE_CLASS_FLAG)?,
            size_gigabytes: flags.required_int64(SIZE_FLAG)?,
            ip_acl: flags.cidr_list(IP_ACL_FLAG)?.unwrap_or_default(),
            snapshots_visible: flags.optional_bool(SNAPSHOTS_VISIBLE_FLAG)?,
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &CreateInput) -> String {
        project_label(ctx, input.globals.project()).await
    }

    fn confirmation(&self, _input: &CreateInput, project: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to create a resource pool for project \"{project}\"?"
        ))
    }

    fn build_request(&self, ctx: &Context, input: &CreateInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .sfs
            .create_resource_pool(input.globals.project(), &input.globals.region)
            .payload(CreateResourcePoolPayload {
                name: input.name.clone(),
                availability_zone: input.availability_zone.clone(),
                performance_class: input.performance_class.to_owned(),
                size_gigabytes: input.size_gigabytes,
                ip_acl: input.ip_acl.clone(),
                snapshots_are_visible: input.snapshots_visible,
            }))
    }

    async fn dispatch(
        &self,
        _ctx: &Context,
        _input: &CreateInput,
        request: Self::Request,
    ) -> Result<ResourcePoolResponse> {
        let response = request.execute().await.remote("create SFS resource pool")?;
        match &response.resource_pool {
            Some(pool) if !pool.id.is_empty() => Ok(response),
            _ => Err(missing_id("create SFS resource pool", "resource pool")),
        }
    }

    fn waits(&self, _input: &CreateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &CreateInput, response: &ResourcePoolResponse) -> Result<()> {
        let pool_id = response.resource_pool.as_ref().map(|p| p.id.as_str()).unwrap_or_default();
        wait_settled(
            ctx,
            &input.globals,
            pool_id,
            "wait for SFS resource pool creation",
            "Creating resource pool",
        )
        .await
    }

    fn render(&self, printer: &Printer, input: &CreateInput, project: &String, response: &ResourcePoolResponse) -> Result<()> {
        printer.result(response, |p| {
            let id = response.resource_pool.as_ref().map(|p| p.id.as_str()).unwrap_or_default();
            p.outputln(&format!(
                "{} resource pool for project \"{project}\". Resource pool ID: {id}",
                created(input.globals.async_mode)
            ))
        })
    }
}

/// Input of the commands addressing one pool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    resource_pool_id: String,
}

impl PoolInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            resource_pool_id: inv.arg(0)?.to_owned(),
        })
    }
}

/// `resource-pool delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = PoolInput;
    type Labels = String;
    type Request = Request<(), NoContent>;
    type Response = NoContent;

    fn parse(&self, inv: &Invocation) -> Result<PoolInput> {
        PoolInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &PoolInput) -> String {
        pool_label(ctx, &input.globals, &input.resource_pool_id).await
    }

    fn confirmation(&self, _input: &PoolInput, pool: &String) -> Option<String> {
        Some(delete_prompt("resource pool", pool))
    }

    fn build_request(&self, ctx: &Context, input: &PoolInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .sfs
            .delete_resource_pool(input.globals.project(), &input.globals.region, &input.resource_pool_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &PoolInput, request: Self::Request) -> Result<NoContent> {
        request.execute().await.remote("delete SFS resource pool")
    }

    fn waits(&self, _input: &PoolInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &PoolInput, _response: &NoContent) -> Result<()> {
        let target = WaitTarget::new(
            format!("resource pool {}", input.resource_pool_id),
            "wait for SFS resource pool deletion",
            "Deleting resource pool",
        );
        let sfs = &ctx.clients.sfs;
        let globals = &input.globals;
        poll(
            ctx,
            &target,
            || {
                let request = sfs.get_resource_pool(globals.project(), &globals.region, &input.resource_pool_id);
                async move { gone_on_not_found(request.execute().await) }
            },
            |response: &Option<ResourcePoolResponse>| match response {
                None => Terminal::Success,
                Some(response) => match response.resource_pool.as_ref().map(|p| p.state.as_str()) {
                    Some("error") => Terminal::Failure("resource entered state \"error\"".to_owned()),
                    Some(state) if !state.is_empty() => Terminal::pending(state),
                    _ => Terminal::pending("deleting"),
                },
            },
            &wait_options(),
        )
        .await?;
        Ok(())
    }

    fn render(&self, printer: &Printer, input: &PoolInput, pool: &String, _response: &NoContent) -> Result<()> {
        printer.info(format_args!(
            "{} resource pool \"{pool}\"",
            deleted(input.globals.async_mode)
        ));
        Ok(())
    }
}

/// `resource-pool describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = PoolInput;
    type Labels = ();
    type Request = Request<(), ResourcePoolResponse>;
    type Response = ResourcePoolResponse;

    fn parse(&self, inv: &Invocation) -> Result<PoolInput> {
        PoolInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &PoolInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .sfs
            .get_resource_pool(input.globals.project(), &input.globals.region, &input.resource_pool_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &PoolInput, request: Self::Request) -> Result<ResourcePoolResponse> {
        request.execute().await.remote("get SFS resource pool")
    }

    fn render(&self, printer: &Printer, input: &PoolInput, _labels: &(), response: &ResourcePoolResponse) -> Result<()> {
        printer.result(response, |p| {
            let Some(pool) = &response.resource_pool else {
                return p.outputln(&format!("Resource pool \"{}\" not found", input.resource_pool_id));
            };
            let mut table = Table::key_value();
            table
                .add_pair("ID", &pool.id)
                .add_separator()
                .add_pair("NAME", &pool.name)
                .add_separator()
                .add_pair("STATE", &pool.state)
                .add_separator()
                .add_pair("AVAILABILITY ZONE", &pool.availability_zone)
                .add_separator()
                .add_pair("PERFORMANCE CLASS", pool.performance_class.as_deref())
                .add_separator()
                .add_pair("SIZE (GB)", pool.size_gigabytes)
                .add_separator()
                .add_pair("IP ACL", Cell::list(&pool.ip_acl))
                .add_separator()
                .add_pair("SNAPSHOTS VISIBLE", pool.snapshots_are_visible)
                .add_separator()
                .add_pair("MOUNT PATH", pool.mount_path.as_deref())
                .add_separator()
                .add_pair("SHARES", pool.count_shares)
                .add_separator()
                .add_pair("CREATED AT", Cell::time(pool.created_at));
            p.output(&table.render())
        })
    }
}

/// Input of `resource-pool list`.
#[derive(Debug, Clone, Serialize)]
pub struct ListInput {
    #[serde(flatten)]
    globals: GlobalFlags,
}

/// `resource-pool list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = ListInput;
    type Labels = ();
    type Request = Request<(), ResourcePoolList>;
    type Response = Vec<ResourcePool>;

    fn parse(&self, inv: &Invocation) -> Result<ListInput> {
        Ok(ListInput {
            globals: inv.globals.clone(),
        })
    }

    fn build_request(&self, ctx: &Context, input: &ListInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .sfs
            .list_resource_pools(input.globals.project(), &input.globals.region))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ListInput, request: Self::Request) -> Result<Vec<ResourcePool>> {
        Ok(request.execute().await.remote("list SFS resource pools")?.resource_pools)
    }

    fn render(&self, printer: &Printer, input: &ListInput, _labels: &(), pools: &Vec<ResourcePool>) -> Result<()> {
        printer.result(pools, |p| {
            if pools.is_empty() {
                p.info(format_args!(
                    "No resource pools found for project \"{}\"",
                    input.globals.project()
                ));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["ID", "NAME", "AVAILABILITY ZONE", "PERFORMANCE CLASS", "SIZE (GB)", "STATE"]);
            for pool in pools {
                table.add_row([
                    Cell::from(&pool.id),
                    Cell::from(&pool.name),
                    Cell::from(&pool.availability_zone),
                    Cell::from(pool.performance_class.as_deref()),
                    Cell::from(pool.size_gigabytes),
                    Cell::from(&pool.state),
                ]);
            }
            p.output(&table.render())
        })
    }
}

/// Input of `resource-pool update`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInput {
    #[serde(flatten)]
    pool: PoolInput,
    #[serde(flatten)]
    payload: UpdateResourcePoolPayload,
}

/// Names shown in the update prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateLabels {
    project: String,
    pool: String,
}

/// `resource-pool update`. Only the given fields are sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Update;

#[async_trait]
impl Operation for Update {
    type Input = UpdateInput;
    type Labels = UpdateLabels;
    type Request = Request<UpdateResourcePoolPayload, ResourcePoolResponse>;
    type Response = ResourcePoolResponse;

    fn parse(&self, inv: &Invocation) -> Result<UpdateInput> {
        let flags = &inv.flags;
        Ok(UpdateInput {
            pool: PoolInput::parse(inv)?,
            payload: UpdateResourcePoolPayload {
                performance_class: flags.enumeration(PERFORMANCE_CLASS_FLAG)?.map(str::to_owned),
                size_gigabytes: flags.int64(SIZE_FLAG)?,
                ip_acl: flags.cidr_list(IP_ACL_FLAG)?,
                snapshots_are_visible: flags.optional_bool(SNAPSHOTS_VISIBLE_FLAG)?,
            },
        })
    }

    fn validate(&self, input: &UpdateInput) -> Result<()> {
        if input.payload.is_empty() {
            return Err(CliError::EmptyUpdate);
        }
        Ok(())
    }

    async fn resolve_labels(&self, ctx: &Context, input: &UpdateInput) -> UpdateLabels {
        let globals = &input.pool.globals;
        UpdateLabels {
            project: project_label(ctx, globals.project()).await,
            pool: pool_label(ctx, globals, &input.pool.resource_pool_id).await,
        }
    }

    fn confirmation(&self, _input: &UpdateInput, labels: &UpdateLabels) -> Option<String> {
        Some(format!(
            "Are you sure you want to update resource pool \"{}\" for project \"{}\"?",
            labels.pool, labels.project
        ))
    }

    fn build_request(&self, ctx: &Context, input: &UpdateInput) -> Result<Self::Request> {
        let pool = &input.pool;
        Ok(ctx
            .clients
            .sfs
            .update_resource_pool(pool.globals.project(), &pool.globals.region, &pool.resource_pool_id)
            .payload(input.payload.clone()))
    }

    async fn dispatch(
        &self,
        _ctx: &Context,
        _input: &UpdateInput,
        request: Self::Request,
    ) -> Result<ResourcePoolResponse> {
        request.execute().await.remote("update SFS resource pool")
    }

    fn waits(&self, _input: &UpdateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &UpdateInput, _response: &ResourcePoolResponse) -> Result<()> {
        wait_settled(
            ctx,
            &input.pool.globals,
            &input.pool.resource_pool_id,
            "wait for SFS resource pool update",
            "Updating resource pool",
        )
        .await
    }

    fn render(
        &self,
        printer: &Printer,
        input: &UpdateInput,
        labels: &UpdateLabels,
        response: &ResourcePoolResponse,
    ) -> Result<()> {
        printer.result(response, |p| {
            let name = response
                .resource_pool
                .as_ref()
                .map(|pool| pool.name.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or(&labels.pool);
            p.outputln(&format!(
                "{} resource pool \"{name}\"",
                updated(input.pool.globals.async_mode)
            ))
        })
    }
}
