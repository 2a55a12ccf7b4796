//! `beta kms version`: versions of a key.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::kms::{Version, VersionList};
use stackit_sdk::{NoContent, Request};

use super::{KEY_FLAG, KEY_RING_FLAG, key_flag, key_ring_flag};
use crate::builder::CommandNode;
use crate::error::{CliError, RemoteExt, Result};
use crate::flags::ArgSpec;
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation, label_or};
use crate::printer::Printer;
use crate::table::{Cell, Table};

const VERSION: &str = "VERSION";

/// The `version` branch.
#[must_use]
pub fn command() -> CommandNode {
    let mut branch = CommandNode::branch("version", "Manage versions of KMS keys")
        .child(
            CommandNode::leaf("list", "Lists all versions of a KMS key", List)
                .example(
                    "List all versions of a key",
                    "stackit beta kms version list --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --key yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy",
                )
                .flag(key_ring_flag())
                .flag(key_flag()),
        )
        .child(
            CommandNode::leaf("describe", "Describes a version of a KMS key", Describe)
                .example(
                    "Describe version 1 of a key",
                    "stackit beta kms version describe 1 --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --key yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy",
                )
                .arg(ArgSpec::non_negative_int(VERSION))
                .flag(key_ring_flag())
                .flag(key_flag()),
        );
    for action in VersionAction::ALL {
        branch = branch.child(
            CommandNode::leaf(action.name(), action.about(), action)
                .example(action.example_description(), action.example())
                .arg(ArgSpec::non_negative_int(VERSION))
                .flag(key_ring_flag())
                .flag(key_flag()),
        );
    }
    branch
}

/// Input of the commands addressing one version, or all of them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    key_ring_id: String,
    key_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_number: Option<i64>,
}

impl VersionInput {
    fn parse(inv: &Invocation, positional: bool) -> Result<Self> {
        let version_number = if positional {
            let raw = inv.arg(0)?;
            Some(raw.parse().map_err(|_| CliError::arg_validation(raw, "must be a non-negative integer"))?)
        } else {
            None
        };
        Ok(Self {
            globals: inv.globals.clone(),
            key_ring_id: inv.flags.required_uuid(KEY_RING_FLAG)?,
            key_id: inv.flags.required_uuid(KEY_FLAG)?,
            version_number,
        })
    }

    fn number(&self) -> Result<i64> {
        self.version_number
            .ok_or_else(|| CliError::internal("version number", "not parsed"))
    }
}

/// `version list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = VersionInput;
    type Labels = ();
    type Request = Request<(), VersionList>;
    type Response = Vec<Version>;

    fn parse(&self, inv: &Invocation) -> Result<VersionInput> {
        VersionInput::parse(inv, false)
    }

    fn build_request(&self, ctx: &Context, input: &VersionInput) -> Result<Self::Request> {
        Ok(ctx.clients.kms.list_versions(
            input.globals.project(),
            &input.globals.region,
            &input.key_ring_id,
            &input.key_id,
        ))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &VersionInput, request: Self::Request) -> Result<Vec<Version>> {
        Ok(request.execute().await.remote("list KMS key versions")?.versions)
    }

    fn render(&self, printer: &Printer, input: &VersionInput, _labels: &(), versions: &Vec<Version>) -> Result<()> {
        printer.result(versions, |p| {
            if versions.is_empty() {
                p.info(format_args!("No versions found for key \"{}\"", input.key_id));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["NUMBER", "STATE", "DISABLED", "DESTROY DATE", "CREATED AT"]);
            for version in versions {
                table.add_row([
                    Cell::from(version.number),
                    Cell::from(&version.state),
                    Cell::from(version.disabled),
                    Cell::time(version.destroy_date),
                    Cell::time(version.created_at),
                ]);
            }
            p.output(&table.render())
        })
    }
}

fn describe_table(version: &Version) -> Table {
    let mut table = Table::key_value();
    table
        .add_pair("NUMBER", version.number)
        .add_separator()
        .add_pair("KEY ID", &version.key_id)
        .add_separator()
        .add_pair("KEY RING ID", &version.key_ring_id)
        .add_separator()
        .add_pair("STATE", &version.state)
        .add_separator()
        .add_pair("DISABLED", version.disabled)
        .add_separator()
        .add_pair("PUBLIC KEY", version.public_key.as_deref())
        .add_separator()
        .add_pair("DESTROY DATE", Cell::time(version.destroy_date))
        .add_separator()
        .add_pair("CREATED AT", Cell::time(version.created_at));
    table
}

/// `version describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = VersionInput;
    type Labels = ();
    type Request = Request<(), Version>;
    type Response = Version;

    fn parse(&self, inv: &Invocation) -> Result<VersionInput> {
        VersionInput::parse(inv, true)
    }

    fn build_request(&self, ctx: &Context, input: &VersionInput) -> Result<Self::Request> {
        Ok(ctx.clients.kms.get_version(
            input.globals.project(),
            &input.globals.region,
            &input.key_ring_id,
            &input.key_id,
            input.number()?,
        ))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &VersionInput, request: Self::Request) -> Result<Version> {
        request.execute().await.remote("get KMS key version")
    }

    fn render(&self, printer: &Printer, _input: &VersionInput, _labels: &(), version: &Version) -> Result<()> {
        printer.result(version, |p| p.output(&describe_table(version).render()))
    }
}

/// A state transition of a key version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionAction {
    /// Makes the version unusable until enabled again.
    Disable,
    /// Reverses [`VersionAction::Disable`].
    Enable,
    /// Schedules destruction of the key material.
    Destroy,
    /// Cancels a scheduled destruction.
    Restore,
}

impl VersionAction {
    const ALL: [Self; 4] = [Self::Disable, Self::Enable, Self::Destroy, Self::Restore];

    /// Subcommand name and API action segment.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Enable => "enable",
            Self::Destroy => "destroy",
            Self::Restore => "restore",
        }
    }

    const fn about(self) -> &'static str {
        match self {
            Self::Disable => "Disables a version of a KMS key",
            Self::Enable => "Enables a version of a KMS key",
            Self::Destroy => "Schedules the destruction of a version of a KMS key",
            Self::Restore => "Restores a version of a KMS key scheduled for destruction",
        }
    }

    const fn example_description(self) -> &'static str {
        match self {
            Self::Disable => "Disable version 1 of a key",
            Self::Enable => "Enable version 1 of a key",
            Self::Destroy => "Destroy version 1 of a key",
            Self::Restore => "Restore version 1 of a key",
        }
    }

    const fn example(self) -> &'static str {
        match self {
            Self::Disable => {
                "stackit beta kms version disable 1 --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --key yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy"
            }
            Self::Enable => {
                "stackit beta kms version enable 1 --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --key yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy"
            }
            Self::Destroy => {
                "stackit beta kms version destroy 1 --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --key yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy"
            }
            Self::Restore => {
                "stackit beta kms version restore 1 --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --key yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy"
            }
        }
    }

    const fn past_tense(self) -> &'static str {
        match self {
            Self::Disable => "Disabled",
            Self::Enable => "Enabled",
            Self::Destroy => "Scheduled the destruction of",
            Self::Restore => "Restored",
        }
    }
}

#[async_trait]
impl Operation for VersionAction {
    type Input = VersionInput;
    type Labels = String;
    type Request = Request<(), NoContent>;
    type Response = Version;

    fn parse(&self, inv: &Invocation) -> Result<VersionInput> {
        VersionInput::parse(inv, true)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &VersionInput) -> String {
        let request = ctx.clients.kms.get_key(
            input.globals.project(),
            &input.globals.region,
            &input.key_ring_id,
            &input.key_id,
        );
        label_or(ctx, "key", &input.key_id, async move {
            request.execute().await.map(|k| k.display_name)
        })
        .await
    }

    fn confirmation(&self, input: &VersionInput, key: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to {} version {} of the KMS key \"{key}\"?",
            self.name(),
            input.version_number.unwrap_or_default()
        ))
    }

    fn build_request(&self, ctx: &Context, input: &VersionInput) -> Result<Self::Request> {
        Ok(ctx.clients.kms.version_action(
            input.globals.project(),
            &input.globals.region,
            &input.key_ring_id,
            &input.key_id,
            input.number()?,
            self.name(),
        ))
    }

    async fn dispatch(&self, ctx: &Context, input: &VersionInput, request: Self::Request) -> Result<Version> {
        let operation = format!("{} KMS key version", self.name());
        request.execute().await.remote(&operation)?;
        ctx.clients
            .kms
            .get_version(
                input.globals.project(),
                &input.globals.region,
                &input.key_ring_id,
                &input.key_id,
                input.number()?,
            )
            .execute()
            .await
            .remote("get KMS key version")
            .map_err(CliError::after_dispatch)
    }

    fn render(&self, printer: &Printer, _input: &VersionInput, key: &String, version: &Version) -> Result<()> {
        printer.result(version, |p| {
            p.outputln(&format!(
                "{} version {} of the KMS key \"{key}\"",
                self.past_tense(),
                version.number
            ))
        })
    }
}
