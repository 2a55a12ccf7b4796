//! `observability instance`: instance lifecycle. Plans are resolved by name or ID.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::observability::{Instance, InstanceList, InstanceMutation, InstancePayload, InstanceSummary};
use stackit_sdk::Request;

use super::plans::{PLAN_ID_FLAG, PLAN_NAME_FLAG, PlanSelector, list_plans, plan_id_flag, plan_name_flag};
use super::{instance_label, instance_state, wait_options};
use crate::builder::CommandNode;
use crate::commands::{created, delete_prompt, deleted, missing_id, updated};
use crate::error::{CliError, RemoteExt, Result};
use crate::flags::{ArgSpec, Constraint, FlagSpec};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation, gone_on_not_found, poll, project_label};
use crate::printer::Printer;
use crate::table::{Cell, Table};
use crate::waiter::{FetchError, Terminal, WaitTarget};

const INSTANCE_ID: &str = "INSTANCE_ID";

fn name_flag() -> FlagSpec {
    FlagSpec::string("name", "Instance name").short('n')
}

/// The `instance` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("instance", "Manage Observability instances")
        .child(
            CommandNode::leaf("create", "Creates an Observability instance", Create)
                .example(
                    "Create an instance and pick the plan by name",
                    "stackit observability instance create --name my-instance --plan-name Observability-Monitoring-Basic-EU01",
                )
                .example(
                    "Create an instance and pick the plan by ID",
                    "stackit observability instance create --name my-instance --plan-id xxx",
                )
                .flag(name_flag().required())
                .flag(plan_id_flag())
                .flag(plan_name_flag())
                .constraints(Constraint::exactly_one(&[PLAN_ID_FLAG, PLAN_NAME_FLAG])),
        )
        .child(
            CommandNode::leaf("delete", "Deletes an Observability instance", Delete)
                .example("Delete an instance", "stackit observability instance delete xxx")
                .arg(ArgSpec::uuid(INSTANCE_ID)),
        )
        .child(
            CommandNode::leaf("describe", "Shows details of an Observability instance", Describe)
                .example("Describe an instance", "stackit observability instance describe xxx")
                .example(
                    "Describe an instance in JSON format",
                    "stackit observability instance describe xxx --output-format json",
                )
                .arg(ArgSpec::uuid(INSTANCE_ID)),
        )
        .child(
            CommandNode::leaf("list", "Lists all Observability instances", List)
                .example("List all instances", "stackit observability instance list"),
        )
        .child(
            CommandNode::leaf("update", "Updates an Observability instance", Update)
                .example(
                    "Move an instance to another plan",
                    "stackit observability instance update xxx --plan-name Observability-Starter-EU01",
                )
                .example(
                    "Rename an instance",
                    "stackit observability instance update xxx --name new-name",
                )
                .arg(ArgSpec::uuid(INSTANCE_ID))
                .flag(name_flag())
                .flag(plan_id_flag())
                .flag(plan_name_flag())
                .constraints([Constraint::MutuallyExclusive(vec![PLAN_ID_FLAG, PLAN_NAME_FLAG])]),
        )
}

/// Polls the instance until its status settles.
async fn wait_instance(ctx: &Context, globals: &GlobalFlags, instance_id: &str, operation: &str, message: &str) -> Result<()> {
    let target = WaitTarget::new(format!("instance {instance_id}"), operation, message);
    let client = &ctx.clients.observability;
    poll(
        ctx,
        &target,
        || {
            let request = client.get_instance(globals.project(), instance_id);
            async move { request.execute().await.map_err(FetchError::from) }
        },
        |instance: &Instance| instance_state(&instance.status, instance.error.as_deref()),
        &wait_options(),
    )
    .await?;
    Ok(())
}

/// Input of `instance create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    name: String,
    plan: PlanSelector,
}

/// `instance create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = CreateInput;
    type Labels = String;
    type Request = Request<InstancePayload, InstanceMutation>;
    type Response = InstanceMutation;

    fn parse(&self, inv: &Invocation) -> Result<CreateInput> {
        Ok(CreateInput {
            globals: inv.globals.clone(),
            name: inv.flags.required_string("name")?,
            plan: PlanSelector::from_flags(&inv.flags)?
                .ok_or_else(|| CliError::internal("parse plan", "neither --plan-id nor --plan-name is set"))?,
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &CreateInput) -> String {
        project_label(ctx, input.globals.project()).await
    }

    fn confirmation(&self, _input: &CreateInput, project: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to create an Observability instance for project \"{project}\"?"
        ))
    }

    fn build_request(&self, ctx: &Context, input: &CreateInput) -> Result<Self::Request> {
        Ok(ctx.clients.observability.create_instance(input.globals.project()))
    }

    async fn dispatch(&self, ctx: &Context, input: &CreateInput, request: Self::Request) -> Result<InstanceMutation> {
        let plan_id = input.plan.resolve(&list_plans(ctx, &input.globals).await?)?;
        let response = request
            .payload(InstancePayload {
                name: Some(input.name.clone()),
                plan_id,
            })
            .execute()
            .await
            .remote("create Observability instance")?;
        match response.instance_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(response),
            _ => Err(missing_id("create Observability instance", "instance")),
        }
    }

    fn waits(&self, _input: &CreateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &CreateInput, response: &InstanceMutation) -> Result<()> {
        let id = response.instance_id.as_deref().unwrap_or_default();
        wait_instance(ctx, &input.globals, id, "wait for Observability instance creation", "Creating instance").await
    }

    fn render(&self, printer: &Printer, input: &CreateInput, project: &String, response: &InstanceMutation) -> Result<()> {
        printer.result(response, |p| {
            p.outputln(&format!(
                "{} instance for project \"{project}\". Instance ID: {}",
                created(input.globals.async_mode),
                response.instance_id.as_deref().unwrap_or_default()
            ))
        })
    }
}

/// Input of the commands addressing one instance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_id: String,
}

impl InstanceInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            instance_id: inv.arg(0)?.to_owned(),
        })
    }
}

/// `instance delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = InstanceInput;
    type Labels = String;
    type Request = Request<(), InstanceMutation>;
    type Response = InstanceMutation;

    fn parse(&self, inv: &Invocation) -> Result<InstanceInput> {
        InstanceInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &InstanceInput) -> String {
        instance_label(ctx, &input.globals, &input.instance_id).await
    }

    fn confirmation(&self, _input: &InstanceInput, instance: &String) -> Option<String> {
        Some(delete_prompt("instance", instance))
    }

    fn build_request(&self, ctx: &Context, input: &InstanceInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .delete_instance(input.globals.project(), &input.instance_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &InstanceInput, request: Self::Request) -> Result<InstanceMutation> {
        request.execute().await.remote("delete Observability instance")
    }

    fn waits(&self, _input: &InstanceInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &InstanceInput, _response: &InstanceMutation) -> Result<()> {
        let target = WaitTarget::new(
            format!("instance {}", input.instance_id),
            "wait for Observability instance deletion",
            "Deleting instance",
        );
        let client = &ctx.clients.observability;
        poll(
            ctx,
            &target,
            || {
                let request = client.get_instance(input.globals.project(), &input.instance_id);
                async move { gone_on_not_found(request.execute().await) }
            },
            |instance: &Option<Instance>| {
                instance
                    .as_ref()
                    .map_or(Terminal::Success, |i| instance_state(&i.status, i.error.as_deref()))
            },
            &wait_options(),
        )
        .await?;
        Ok(())
    }

    fn render(&self, printer: &Printer, input: &InstanceInput, instance: &String, _response: &InstanceMutation) -> Result<()> {
        printer.info(format_args!(
            "{} instance \"{instance}\"",
            deleted(input.globals.async_mode)
        ));
        Ok(())
    }
}

/// `instance describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = InstanceInput;
    type Labels = ();
    type Request = Request<(), Instance>;
    type Response = Instance;

    fn parse(&self, inv: &Invocation) -> Result<InstanceInput> {
        InstanceInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &InstanceInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .get_instance(input.globals.project(), &input.instance_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &InstanceInput, request: Self::Request) -> Result<Instance> {
        request.execute().await.remote("read Observability instance")
    }

    fn render(&self, printer: &Printer, _input: &InstanceInput, _labels: &(), instance: &Instance) -> Result<()> {
        printer.result(instance, |p| {
            let details = instance.instance.clone().unwrap_or_default();
            let mut table = Table::key_value();
            table
                .add_pair("ID", &instance.id)
                .add_separator()
                .add_pair("NAME", &instance.name)
                .add_separator()
                .add_pair("STATUS", &instance.status)
                .add_separator()
                .add_pair("PLAN NAME", instance.plan_name.as_deref())
                .add_separator()
                .add_pair("PLAN ID", &instance.plan_id)
                .add_separator()
                .add_pair("GRAFANA URL", details.grafana_url)
                .add_separator()
                .add_pair("METRICS URL", details.metrics_url)
                .add_separator()
                .add_pair("PUSH METRICS URL", details.push_metrics_url)
                .add_separator()
                .add_pair("LOGS URL", details.logs_url)
                .add_separator()
                .add_pair("ALERTING URL", details.alerting_url);
            p.output(&table.render())
        })
    }
}

/// `instance list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = GlobalFlags;
    type Labels = ();
    type Request = Request<(), InstanceList>;
    type Response = Vec<InstanceSummary>;

    fn parse(&self, inv: &Invocation) -> Result<GlobalFlags> {
        Ok(inv.globals.clone())
    }

    fn build_request(&self, ctx: &Context, globals: &GlobalFlags) -> Result<Self::Request> {
        Ok(ctx.clients.observability.list_instances(globals.project()))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &GlobalFlags, request: Self::Request) -> Result<Vec<InstanceSummary>> {
        Ok(request
            .execute()
            .await
            .remote("get Observability instances")?
            .instances)
    }

    fn render(&self, printer: &Printer, globals: &GlobalFlags, _labels: &(), instances: &Vec<InstanceSummary>) -> Result<()> {
        printer.result(instances, |p| {
            if instances.is_empty() {
                p.info(format_args!(
                    "No instances found for project \"{}\"",
                    globals.project()
                ));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["ID", "NAME", "PLAN", "STATUS"]);
            for instance in instances {
                table.add_row([
                    Cell::from(&instance.id),
                    Cell::from(&instance.name),
                    Cell::from(instance.plan_name.as_deref()),
                    Cell::from(&instance.status),
                ]);
            }
            p.output(&table.render())
        })
    }
}

/// Input of `instance update`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInput {
    #[serde(flatten)]
    instance: InstanceInput,
    name: Option<String>,
    plan: Option<PlanSelector>,
}

/// `instance update`. Unset fields keep their current values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Update;

#[async_trait]
impl Operation for Update {
    type Input = UpdateInput;
    type Labels = String;
    type Request = Request<InstancePayload, InstanceMutation>;
    type Response = InstanceMutation;

    fn parse(&self, inv: &Invocation) -> Result<UpdateInput> {
        Ok(UpdateInput {
            instance: InstanceInput::parse(inv)?,
            name: inv.flags.string("name")?,
            plan: PlanSelector::from_flags(&inv.flags)?,
        })
    }

    fn validate(&self, input: &UpdateInput) -> Result<()> {
        if input.name.is_none() && input.plan.is_none() {
            return Err(CliError::EmptyUpdate);
        }
        Ok(())
    }

    async fn resolve_labels(&self, ctx: &Context, input: &UpdateInput) -> String {
        instance_label(ctx, &input.instance.globals, &input.instance.instance_id).await
    }

    fn confirmation(&self, _input: &UpdateInput, instance: &String) -> Option<String> {
        Some(format!("Are you sure you want to update instance \"{instance}\"?"))
    }

    fn build_request(&self, ctx: &Context, input: &UpdateInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .update_instance(input.instance.globals.project(), &input.instance.instance_id))
    }

    async fn dispatch(&self, ctx: &Context, input: &UpdateInput, request: Self::Request) -> Result<InstanceMutation> {
        let globals = &input.instance.globals;
        let plans = list_plans(ctx, globals).await?;
        let current = ctx
            .clients
            .observability
            .get_instance(globals.project(), &input.instance.instance_id)
            .execute()
            .await
            .remote("get Observability instance")?;
        let plan_id = match &input.plan {
            Some(plan) => plan.resolve(&plans)?,
            None => current.plan_id,
        };
        request
            .payload(InstancePayload {
                name: input.name.clone().or(Some(current.name)),
                plan_id,
            })
            .execute()
            .await
            .remote("update Observability instance")
    }

    fn waits(&self, _input: &UpdateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &UpdateInput, _response: &InstanceMutation) -> Result<()> {
        wait_instance(
            ctx,
            &input.instance.globals,
            &input.instance.instance_id,
            "wait for Observability instance update",
            "Updating instance",
        )
        .await
    }

    fn render(&self, printer: &Printer, input: &UpdateInput, instance: &String, _response: &InstanceMutation) -> Result<()> {
        printer.info(format_args!(
            "{} instance \"{instance}\"",
            updated(input.instance.globals.async_mode)
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stackit_sdk::Method;

    use crate::commands::testing::{PROJECT, Stub, run};

    const INSTANCE: &str = "55555555-5555-5555-5555-555555555555";
    const PLAN: &str = "22222222-2222-2222-2222-222222222222";

    fn project_path() -> String {
        format!("/v1/projects/{PROJECT}")
    }

    fn instance_path() -> String {
        format!("{}/instances/{INSTANCE}", project_path())
    }

    fn plans() -> serde_json::Value {
        json!({"plans": [
            {"planId": PLAN, "name": "Observability-Monitoring-Basic-EU01"},
            {"planId": "33333333-3333-3333-3333-333333333333", "name": "Observability-Starter-EU01"}
        ]})
    }

    #[tokio::test]
    async fn create_resolves_the_plan_name_and_waits() {
        let stub = Stub::new()
            .json(Method::Get, &format!("{}/plans", project_path()), plans())
            .json(Method::Post, &format!("{}/instances", project_path()), json!({"instanceId": INSTANCE}))
            .json(Method::Get, &instance_path(), json!({"id": INSTANCE, "status": "CREATE_SUCCEEDED"}));
        let outcome = run(
            &stub,
            &[
                "observability", "instance", "create", "-n", "my-instance", "--plan-name",
                "observability-monitoring-basic-eu01", "--project-id", PROJECT, "-y",
            ],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(
            stub.body(Method::Post, &format!("{}/instances", project_path())),
            Some(json!({"name": "my-instance", "planId": PLAN}))
        );
        assert_eq!(stub.count(Method::Get, &instance_path()), 1);
        assert_eq!(
            outcome.out,
            format!("Created instance for project \"{PROJECT}\". Instance ID: {INSTANCE}\n")
        );
    }

    #[tokio::test]
    async fn unknown_plan_stops_before_the_create_call() {
        let stub = Stub::new().json(Method::Get, &format!("{}/plans", project_path()), plans());
        let outcome = run(
            &stub,
            &["observability", "instance", "create", "-n", "i", "--plan-name", "gold", "--project-id", PROJECT, "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 1);
        assert!(
            outcome.err.contains("You provided plan name \"gold\", which is invalid. Available plan names are: \n- Observability-Monitoring-Basic-EU01"),
            "{}",
            outcome.err
        );
        assert!(!outcome.err.contains("may have already taken effect"));
        assert_eq!(stub.count(Method::Post, &format!("{}/instances", project_path())), 0);
    }

    #[tokio::test]
    async fn create_rejects_both_plan_flags() {
        let stub = Stub::new();
        let outcome = run(
            &stub,
            &[
                "observability", "instance", "create", "-n", "i", "--plan-name", "x", "--plan-id", PLAN,
                "--project-id", PROJECT,
            ],
            "",
        )
        .await;
        assert_ne!(outcome.code, 0);
        assert!(outcome.err.contains("[plan-id plan-name] were all set"), "{}", outcome.err);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn update_without_fields_is_empty() {
        let stub = Stub::new();
        let outcome = run(&stub, &["observability", "instance", "update", INSTANCE, "--project-id", PROJECT], "").await;
        assert_eq!(outcome.code, 1);
        assert_eq!(outcome.err, "Error: Provide at least one field to update.\n");
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn rename_keeps_the_current_plan() {
        let stub = Stub::new()
            .json(Method::Get, &format!("{}/plans", project_path()), plans())
            .json(
                Method::Get,
                &instance_path(),
                json!({"id": INSTANCE, "name": "old", "planId": PLAN, "status": "UPDATE_SUCCEEDED"}),
            )
            .json(Method::Put, &instance_path(), json!({"instanceId": INSTANCE}));
        let outcome = run(
            &stub,
            &["observability", "instance", "update", INSTANCE, "--name", "new", "--project-id", PROJECT, "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(stub.body(Method::Put, &instance_path()), Some(json!({"name": "new", "planId": PLAN})));
        assert_eq!(outcome.err, "Updated instance \"old\"\n");
    }

    #[tokio::test]
    async fn delete_waits_until_the_instance_is_gone() {
        let stub = Stub::new()
            .json(Method::Get, &instance_path(), json!({"id": INSTANCE, "name": "obs"}))
            .json(Method::Delete, &instance_path(), json!({"message": "accepted"}))
            .on(Method::Get, &instance_path(), crate::commands::testing::Reply::Status(404));
        let outcome = run(&stub, &["observability", "instance", "delete", INSTANCE, "--project-id", PROJECT, "-y"], "").await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(stub.count(Method::Get, &instance_path()), 2);
        assert_eq!(outcome.err, "Deleted instance \"obs\"\n");
    }
}
