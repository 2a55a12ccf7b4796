//! `observability credentials`: technical users for remote write and Grafana.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::observability::{CreateCredentialsResponse, CredentialsList, CredentialsSummary};
use stackit_sdk::{NoContent, Request};

use super::{INSTANCE_FLAG, instance_flag, instance_label};
use crate::builder::CommandNode;
use crate::error::{RemoteExt, Result};
use crate::flags::ArgSpec;
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation};
use crate::printer::Printer;
use crate::table::{Cell, Table};

const USERNAME: &str = "USERNAME";

/// The `credentials` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("credentials", "Provides functionality for Observability credentials")
        .child(
            CommandNode::leaf("create", "Creates credentials for an Observability instance", Create)
                .long_about(
                    "Creates credentials (username and password) for an Observability instance.\n\
                     The password is only shown once; it cannot be retrieved later.",
                )
                .example(
                    "Create credentials for the instance with ID \"xxx\"",
                    "stackit observability credentials create --instance-id xxx",
                )
                .flag(instance_flag()),
        )
        .child(
            CommandNode::leaf("delete", "Deletes credentials of an Observability instance", Delete)
                .example(
                    "Delete the credentials of user \"my-user\"",
                    "stackit observability credentials delete my-user --instance-id xxx",
                )
                .arg(ArgSpec::identifier(USERNAME))
                .flag(instance_flag()),
        )
        .child(
            CommandNode::leaf("list", "Lists the usernames of all credentials of an instance", List)
                .example(
                    "List the credentials of the instance with ID \"xxx\"",
                    "stackit observability credentials list --instance-id xxx",
                )
                .flag(instance_flag()),
        )
}

/// Instance addressed by `--instance-id`.
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
            instance_id: inv.flags.required_uuid(INSTANCE_FLAG)?,
        })
    }
}

/// `credentials create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = InstanceInput;
    type Labels = String;
    type Request = Request<(), CreateCredentialsResponse>;
    type Response = CreateCredentialsResponse;

    fn parse(&self, inv: &Invocation) -> Result<InstanceInput> {
        InstanceInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &InstanceInput) -> String {
        instance_label(ctx, &input.globals, &input.instance_id).await
    }

    fn confirmation(&self, _input: &InstanceInput, instance: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to create credentials for instance \"{instance}\"?"
        ))
    }

    fn build_request(&self, ctx: &Context, input: &InstanceInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .create_credentials(input.globals.project(), &input.instance_id))
    }

    async fn dispatch(
        &self,
        _ctx: &Context,
        _input: &InstanceInput,
        request: Self::Request,
    ) -> Result<CreateCredentialsResponse> {
        request.execute().await.remote("create Observability credentials")
    }

    fn render(
        &self,
        printer: &Printer,
        _input: &InstanceInput,
        instance: &String,
        response: &CreateCredentialsResponse,
    ) -> Result<()> {
        printer.result(response, |p| {
            let credentials = &response.credentials;
            p.outputln(&format!(
                "Created credentials for instance \"{instance}\".\n\n\
                 Username: {}\n\
                 Password: {}",
                credentials.username, credentials.password
            ))
        })
    }
}

/// Input of `credentials delete`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteInput {
    #[serde(flatten)]
    instance: InstanceInput,
    username: String,
}

/// `credentials delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = DeleteInput;
    type Labels = String;
    type Request = Request<(), NoContent>;
    type Response = NoContent;

    fn parse(&self, inv: &Invocation) -> Result<DeleteInput> {
        Ok(DeleteInput {
            instance: InstanceInput::parse(inv)?,
            username: inv.arg(0)?.to_owned(),
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &DeleteInput) -> String {
        instance_label(ctx, &input.instance.globals, &input.instance.instance_id).await
    }

    fn confirmation(&self, input: &DeleteInput, instance: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to delete credentials for username \"{}\" of instance \"{instance}\"? (This cannot be undone)",
            input.username
        ))
    }

    fn build_request(&self, ctx: &Context, input: &DeleteInput) -> Result<Self::Request> {
        Ok(ctx.clients.observability.delete_credentials(
            input.instance.globals.project(),
            &input.instance.instance_id,
            &input.username,
        ))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &DeleteInput, request: Self::Request) -> Result<NoContent> {
        request.execute().await.remote("delete Observability credentials")
    }

    fn render(&self, printer: &Printer, input: &DeleteInput, instance: &String, _response: &NoContent) -> Result<()> {
        printer.info(format_args!(
            "Deleted credentials for username \"{}\" of instance \"{instance}\"",
            input.username
        ));
        Ok(())
    }
}

/// `credentials list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = InstanceInput;
    type Labels = ();
    type Request = Request<(), CredentialsList>;
    type Response = Vec<CredentialsSummary>;

    fn parse(&self, inv: &Invocation) -> Result<InstanceInput> {
        InstanceInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &InstanceInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .list_credentials(input.globals.project(), &input.instance_id))
    }

    async fn dispatch(
        &self,
        _ctx: &Context,
        _input: &InstanceInput,
        request: Self::Request,
    ) -> Result<Vec<CredentialsSummary>> {
        Ok(request.execute().await.remote("list Observability credentials")?.credentials)
    }

    fn render(
        &self,
        printer: &Printer,
        input: &InstanceInput,
        _labels: &(),
        credentials: &Vec<CredentialsSummary>,
    ) -> Result<()> {
        printer.result(credentials, |p| {
            if credentials.is_empty() {
                p.info(format_args!(
                    "No credentials found for instance \"{}\"",
                    input.instance_id
                ));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["USERNAME"]);
            for entry in credentials {
                table.add_row([Cell::from(&entry.name)]);
            }
            p.output(&table.render())
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stackit_sdk::Method;

    use super::*;
    use crate::commands::testing::{PROJECT, Reply, Stub, run};

    const INSTANCE: &str = "55555555-5555-5555-5555-555555555555";

    fn credentials_path() -> String {
        format!("/v1/projects/{PROJECT}/instances/{INSTANCE}/credentials")
    }

    #[tokio::test]
    async fn create_prints_username_and_password() {
        let stub = Stub::new()
            .json(
                Method::Get,
                &format!("/v1/projects/{PROJECT}/instances/{INSTANCE}"),
                json!({"id": INSTANCE, "name": "metrics"}),
            )
            .json(
                Method::Post,
                &credentials_path(),
                json!({"credentials": {"username": "u-1", "password": "secret"}}),
            );
        let outcome = run(
            &stub,
            &["observability", "credentials", "create", "--instance-id", INSTANCE, "--project-id", PROJECT],
            "y\n",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert!(
            outcome
                .err
                .contains("Are you sure you want to create credentials for instance \"metrics\"?"),
            "{}",
            outcome.err
        );
        assert_eq!(
            outcome.out,
            "Created credentials for instance \"metrics\".\n\nUsername: u-1\nPassword: secret\n"
        );
    }

    #[tokio::test]
    async fn list_shows_usernames() {
        let stub = Stub::new().json(
            Method::Get,
            &credentials_path(),
            json!({"credentials": [{"name": "u-1"}, {"name": "u-2", "id": "k"}]}),
        );
        let outcome = run(
            &stub,
            &["observability", "credentials", "list", "--instance-id", INSTANCE, "--project-id", PROJECT],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(outcome.out, "USERNAME\n────────\nu-1\nu-2\n");
    }

    #[tokio::test]
    async fn delete_reports_remote_failures() {
        let stub = Stub::new().on(
            Method::Delete,
            &format!("{}/u-1", credentials_path()),
            Reply::Status(403),
        );
        let outcome = run(
            &stub,
            &[
                "observability", "credentials", "delete", "u-1", "--instance-id", INSTANCE, "--project-id", PROJECT, "-y",
            ],
            "",
        )
        .await;
        assert_ne!(outcome.code, 0);
        assert!(outcome.err.contains("delete Observability credentials: HTTP 403"), "{}", outcome.err);
    }

    #[tokio::test]
    async fn instance_id_is_required() {
        let stub = Stub::new();
        let outcome = run(&stub, &["observability", "credentials", "list", "--project-id", PROJECT], "").await;
        assert_ne!(outcome.code, 0);
        assert!(stub.calls().is_empty());
    }
}
