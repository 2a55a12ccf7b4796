//! `beta sfs export-policy`: access rules shared by SFS shares.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::sfs::{
    CreateExportPolicyPayload, ExportPolicy, ExportPolicyList, ExportPolicyResponse, ExportPolicyRule,
    UpdateExportPolicyPayload,
};
use stackit_sdk::{NoContent, Request};

use crate::builder::CommandNode;
use crate::commands::{delete_prompt, missing_id};
use crate::error::{CliError, RemoteExt, Result};
use crate::flags::{ArgSpec, Constraint, FlagError, FlagKind, FlagSpec, FlagValues};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation, label_or, project_label};
use crate::printer::Printer;
use crate::table::{Cell, Table, render_tables};

const POLICY_ID: &str = "EXPORT_POLICY_ID";
const RULES_FLAG: &str = "rules";
const REMOVE_RULES_FLAG: &str = "remove-rules";

fn rules_flag() -> FlagSpec {
    FlagSpec::new(
        RULES_FLAG,
        FlagKind::ReadFromFile,
        "Rules of the export policy as a JSON array, or @path to a file containing it",
    )
}

/// The `export-policy` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("export-policy", "Manage SFS export policies")
        .child(
            CommandNode::leaf("create", "Creates an export policy", Create)
                .example(
                    "Create an export policy without rules",
                    "stackit beta sfs export-policy create --name my-policy",
                )
                .example(
                    "Create an export policy with rules read from a file",
                    "stackit beta sfs export-policy create --name my-policy --rules @rules.json",
                )
                .flag(FlagSpec::string("name", "Name of the export policy").required())
                .flag(rules_flag()),
        )
        .child(
            CommandNode::leaf("delete", "Deletes an export policy", Delete)
                .example("Delete an export policy", "stackit beta sfs export-policy delete xxx")
                .arg(ArgSpec::identifier(POLICY_ID)),
        )
        .child(
            CommandNode::leaf("describe", "Describes an export policy", Describe)
                .example("Describe an export policy", "stackit beta sfs export-policy describe xxx")
                .arg(ArgSpec::identifier(POLICY_ID)),
        )
        .child(
            CommandNode::leaf("list", "Lists all export policies of a project", List)
                .example("List all export policies", "stackit beta sfs export-policy list"),
        )
        .child(
            CommandNode::leaf("update", "Updates the rules of an export policy", Update)
                .example(
                    "Replace the rules of an export policy",
                    "stackit beta sfs export-policy update xxx --rules @rules.json",
                )
                .example(
                    "Remove all rules of an export policy",
                    "stackit beta sfs export-policy update xxx --remove-rules",
                )
                .arg(ArgSpec::identifier(POLICY_ID))
                .flag(rules_flag())
                .flag(FlagSpec::bool(REMOVE_RULES_FLAG, "Remove all rules of the export policy"))
                .constraints(Constraint::exactly_one(&[RULES_FLAG, REMOVE_RULES_FLAG])),
        )
}

/// Parses `--rules`. `null` parses to `None`.
fn parse_rules(flags: &FlagValues) -> Result<Option<Vec<ExportPolicyRule>>> {
    let Some(raw) = flags.read_from_file(RULES_FLAG)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw).map_err(|e| FlagError::InvalidJson(e.to_string()).for_flag(RULES_FLAG))
}

/// Rules of an export policy, one separated row per rule.
pub(super) fn rules_table(rules: &[ExportPolicyRule]) -> Table {
    let mut table = Table::new();
    table.set_header([
        "ID",
        "ORDER",
        "DESCRIPTION",
        "IP ACL",
        "READ ONLY",
        "SET UUID",
        "SUPER USER",
        "CREATED AT",
    ]);
    for rule in rules {
        table
            .add_row([
                Cell::from(rule.id.as_deref()),
                Cell::from(rule.order),
                Cell::from(rule.description.as_deref()),
                Cell::list(&rule.ip_acl),
                Cell::from(rule.read_only),
                Cell::from(rule.set_uuid),
                Cell::from(rule.super_user),
                Cell::time(rule.created_at),
            ])
            .add_separator();
    }
    table
}

/// Input of `export-policy create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    #[serde(flatten)]
    payload: CreateExportPolicyPayload,
}

/// `export-policy create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = CreateInput;
    type Labels = String;
    type Request = Request<CreateExportPolicyPayload, ExportPolicyResponse>;
    type Response = ExportPolicyResponse;

    fn parse(&self, inv: &Invocation) -> Result<CreateInput> {
        Ok(CreateInput {
            globals: inv.globals.clone(),
            payload: CreateExportPolicyPayload {
                name: inv.flags.required_string("name")?,
                rules: parse_rules(&inv.flags)?,
            },
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &CreateInput) -> String {
        project_label(ctx, input.globals.project()).await
    }

    fn confirmation(&self, _input: &CreateInput, project: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to create an export policy for project \"{project}\"?"
        ))
    }

    fn build_request(&self, ctx: &Context, input: &CreateInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .sfs
            .create_export_policy(input.globals.project(), &input.globals.region)
            .payload(input.payload.clone()))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &CreateInput, request: Self::Request) -> Result<ExportPolicyResponse> {
        let response = request.execute().await.remote("create export policy")?;
        match &response.share_export_policy {
            Some(policy) if !policy.id.is_empty() => Ok(response),
            _ => Err(missing_id("create export policy", "export policy")),
        }
    }

    fn render(&self, printer: &Printer, _input: &CreateInput, project: &String, response: &ExportPolicyResponse) -> Result<()> {
        printer.result(response, |p| {
            let id = response
                .share_export_policy
                .as_ref()
                .map(|policy| policy.id.as_str())
                .unwrap_or_default();
            p.outputln(&format!(
                "Created export policy for project \"{project}\". Export policy ID: {id}"
            ))
        })
    }
}

/// Input of the commands addressing one export policy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    policy_id: String,
}

impl PolicyInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            policy_id: inv.arg(0)?.to_owned(),
        })
    }

    fn get(&self, ctx: &Context) -> Request<(), ExportPolicyResponse> {
        ctx.clients
            .sfs
            .get_export_policy(self.globals.project(), &self.globals.region, &self.policy_id)
    }

    async fn label(&self, ctx: &Context) -> String {
        let request = self.get(ctx);
        label_or(ctx, "export policy", &self.policy_id, async move {
            request
                .execute()
                .await
                .map(|r| r.share_export_policy.map(|p| p.name).unwrap_or_default())
        })
        .await
    }
}

/// `export-policy delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = PolicyInput;
    type Labels = String;
    type Request = Request<(), NoContent>;
    type Response = NoContent;

    fn parse(&self, inv: &Invocation) -> Result<PolicyInput> {
        PolicyInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &PolicyInput) -> String {
        input.label(ctx).await
    }

    fn confirmation(&self, _input: &PolicyInput, policy: &String) -> Option<String> {
        Some(delete_prompt("export policy", policy))
    }

    fn build_request(&self, ctx: &Context, input: &PolicyInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .sfs
            .delete_export_policy(input.globals.project(), &input.globals.region, &input.policy_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &PolicyInput, request: Self::Request) -> Result<NoContent> {
        request.execute().await.remote("delete export policy")
    }

    fn render(&self, printer: &Printer, _input: &PolicyInput, policy: &String, _response: &NoContent) -> Result<()> {
        printer.info(format_args!("Deleted export policy \"{policy}\""));
        Ok(())
    }
}

/// `export-policy describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = PolicyInput;
    type Labels = ();
    type Request = Request<(), ExportPolicyResponse>;
    type Response = ExportPolicyResponse;

    fn parse(&self, inv: &Invocation) -> Result<PolicyInput> {
        PolicyInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &PolicyInput) -> Result<Self::Request> {
        Ok(input.get(ctx))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &PolicyInput, request: Self::Request) -> Result<ExportPolicyResponse> {
        request.execute().await.remote("describe export policy")
    }

    fn render(&self, printer: &Printer, input: &PolicyInput, _labels: &(), response: &ExportPolicyResponse) -> Result<()> {
        printer.result(response, |p| {
            let Some(policy) = &response.share_export_policy else {
                return p.outputln(&format!("Export policy \"{}\" not found", input.policy_id));
            };
            p.output(&render_tables(&policy_tables(policy)))
        })
    }
}

fn policy_tables(policy: &ExportPolicy) -> Vec<Table> {
    let mut table = Table::key_value();
    table
        .set_title("Export Policy")
        .add_pair("ID", &policy.id)
        .add_separator()
        .add_pair("NAME", &policy.name)
        .add_separator()
        .add_pair("SHARES USING EXPORT POLICY", policy.shares_using_export_policy)
        .add_separator()
        .add_pair("CREATED AT", Cell::time(policy.created_at));
    if policy.rules.is_empty() {
        return vec![table];
    }
    let mut rules = rules_table(&policy.rules);
    rules.set_title("Rules");
    vec![table, rules]
}

/// `export-policy list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = GlobalFlags;
    type Labels = ();
    type Request = Request<(), ExportPolicyList>;
    type Response = Vec<ExportPolicy>;

    fn parse(&self, inv: &Invocation) -> Result<GlobalFlags> {
        Ok(inv.globals.clone())
    }

    fn build_request(&self, ctx: &Context, globals: &GlobalFlags) -> Result<Self::Request> {
        Ok(ctx.clients.sfs.list_export_policies(globals.project(), &globals.region))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &GlobalFlags, request: Self::Request) -> Result<Vec<ExportPolicy>> {
        Ok(request
            .execute()
            .await
            .remote("list export policies")?
            .share_export_policies)
    }

    fn render(&self, printer: &Printer, globals: &GlobalFlags, _labels: &(), policies: &Vec<ExportPolicy>) -> Result<()> {
        printer.result(policies, |p| {
            if policies.is_empty() {
                p.info(format_args!(
                    "No export policies found for project \"{}\"",
                    globals.project()
                ));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["ID", "NAME", "RULES", "SHARES USING EXPORT POLICY", "CREATED AT"]);
            for policy in policies {
                table.add_row([
                    Cell::from(&policy.id),
                    Cell::from(&policy.name),
                    Cell::from(policy.rules.len()),
                    Cell::from(policy.shares_using_export_policy),
                    Cell::time(policy.created_at),
                ]);
            }
            p.output(&table.render())
        })
    }
}

/// Input of `export-policy update`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInput {
    #[serde(flatten)]
    policy: PolicyInput,
    #[serde(flatten)]
    payload: UpdateExportPolicyPayload,
}

/// Names of a policy and its project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyLabels {
    policy: String,
    project: String,
}

/// `export-policy update`. Replaces the whole rule list.
#[derive(Debug, Clone, Copy, Default)]
pub struct Update;

#[async_trait]
impl Operation for Update {
    type Input = UpdateInput;
    type Labels = PolicyLabels;
    type Request = Request<UpdateExportPolicyPayload, ExportPolicyResponse>;
    type Response = ExportPolicyResponse;

    fn parse(&self, inv: &Invocation) -> Result<UpdateInput> {
        let rules = if inv.flags.bool(REMOVE_RULES_FLAG)? {
            Vec::new()
        } else {
            parse_rules(&inv.flags)?
                .ok_or_else(|| CliError::flag_validation(RULES_FLAG, "no rules specified"))?
        };
        Ok(UpdateInput {
            policy: PolicyInput::parse(inv)?,
            payload: UpdateExportPolicyPayload { rules: Some(rules) },
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &UpdateInput) -> PolicyLabels {
        PolicyLabels {
            policy: input.policy.label(ctx).await,
            project: project_label(ctx, input.policy.globals.project()).await,
        }
    }

    fn confirmation(&self, _input: &UpdateInput, labels: &PolicyLabels) -> Option<String> {
        Some(format!(
            "Are you sure you want to update export policy \"{}\" for project \"{}\"?",
            labels.policy, labels.project
        ))
    }

    fn build_request(&self, ctx: &Context, input: &UpdateInput) -> Result<Self::Request> {
        let policy = &input.policy;
        Ok(ctx
            .clients
            .sfs
            .update_export_policy(policy.globals.project(), &policy.globals.region, &policy.policy_id)
            .payload(input.payload.clone()))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &UpdateInput, request: Self::Request) -> Result<ExportPolicyResponse> {
        request.execute().await.remote("update export policy")
    }

    fn render(&self, printer: &Printer, _input: &UpdateInput, labels: &PolicyLabels, response: &ExportPolicyResponse) -> Result<()> {
        printer.result(response, |p| {
            p.outputln(&format!(
                "Updated export policy \"{}\" for project \"{}\"",
                labels.policy, labels.project
            ))
        })
    }
}
