//! `observability plans` and plan lookup for instance commands.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::Request;
use stackit_sdk::observability::{Plan, PlansResponse};

use crate::builder::CommandNode;
use crate::error::{CliError, RemoteExt, Result};
use crate::flags::{FlagSpec, FlagValues};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation};
use crate::printer::Printer;
use crate::table::{Cell, Table};

pub(crate) const PLAN_ID_FLAG: &str = "plan-id";
pub(crate) const PLAN_NAME_FLAG: &str = "plan-name";

/// The `plans` leaf.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::leaf("plans", "Lists all Observability service plans", Plans).example(
        "List all Observability service plans",
        "stackit observability plans",
    )
}

pub(crate) fn plan_id_flag() -> FlagSpec {
    FlagSpec::uuid(PLAN_ID_FLAG, "Plan ID")
}

pub(crate) fn plan_name_flag() -> FlagSpec {
    FlagSpec::string(PLAN_NAME_FLAG, "Plan name")
}

/// How the user named a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanSelector {
    /// `--plan-id`.
    Id(String),
    /// `--plan-name`, matched case-insensitively.
    Name(String),
}

impl PlanSelector {
    /// Reads `--plan-id` or `--plan-name`. Exclusivity is enforced by the
    /// leaf's constraints.
    pub(crate) fn from_flags(flags: &FlagValues) -> Result<Option<Self>> {
        if let Some(id) = flags.uuid(PLAN_ID_FLAG)? {
            return Ok(Some(Self::Id(id)));
        }
        Ok(flags.string(PLAN_NAME_FLAG)?.map(Self::Name))
    }

    /// Returns the plan ID to send, checked against the available plans.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidPlan`] if no plan matches.
    pub(crate) fn resolve(&self, plans: &[Plan]) -> Result<String> {
        match self {
            Self::Id(id) => plans
                .iter()
                .find(|plan| plan.plan_id.eq_ignore_ascii_case(id))
                .map(|plan| plan.plan_id.clone())
                .ok_or_else(|| CliError::InvalidPlan {
                    details: format!("You provided plan ID {id:?}, which is invalid."),
                }),
            Self::Name(name) => {
                if let Some(plan) = plans.iter().find(|plan| plan.name.eq_ignore_ascii_case(name)) {
                    return Ok(plan.plan_id.clone());
                }
                let available: String = plans
                    .iter()
                    .filter(|plan| !plan.name.is_empty())
                    .map(|plan| format!("\n- {}", plan.name))
                    .collect();
                Err(CliError::InvalidPlan {
                    details: format!(
                        "You provided plan name {name:?}, which is invalid. Available plan names are: {available}"
                    ),
                })
            }
        }
    }
}

/// Fetches the plans of a project.
pub(crate) async fn list_plans(ctx: &Context, globals: &GlobalFlags) -> Result<Vec<Plan>> {
    Ok(ctx
        .clients
        .observability
        .list_plans(globals.project())
        .execute()
        .await
        .remote("get Observability plans")?
        .plans)
}

/// `observability plans`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plans;

#[async_trait]
impl Operation for Plans {
    type Input = GlobalFlags;
    type Labels = ();
    type Request = Request<(), PlansResponse>;
    type Response = Vec<Plan>;

    fn parse(&self, inv: &Invocation) -> Result<GlobalFlags> {
        Ok(inv.globals.clone())
    }

    fn build_request(&self, ctx: &Context, globals: &GlobalFlags) -> Result<Self::Request> {
        Ok(ctx.clients.observability.list_plans(globals.project()))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &GlobalFlags, request: Self::Request) -> Result<Vec<Plan>> {
        Ok(request.execute().await.remote("get Observability plans")?.plans)
    }

    fn render(&self, printer: &Printer, globals: &GlobalFlags, _labels: &(), plans: &Vec<Plan>) -> Result<()> {
        printer.result(plans, |p| {
            if plans.is_empty() {
                p.info(format_args!(
                    "No plans found for project \"{}\"",
                    globals.project()
                ));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["ID", "PLAN NAME", "DESCRIPTION"]);
            for plan in plans {
                table
                    .add_row([
                        Cell::from(&plan.plan_id),
                        Cell::from(&plan.name),
                        Cell::from(plan.description.as_deref()),
                    ])
                    .add_separator();
            }
            p.output(&table.render())
        })
    }
}
