//! `beta kms keyring`: key ring lifecycle.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::kms::{CreateKeyRingPayload, KeyRing, KeyRingList};
use stackit_sdk::{NoContent, Request};

use super::{creation_state, wait_options};
use crate::builder::CommandNode;
use crate::commands::{created, delete_prompt, require_id};
use crate::error::{RemoteExt, Result};
use crate::flags::{ArgSpec, FlagSpec};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation, label_or, poll, project_label};
use crate::printer::Printer;
use crate::table::{Cell, Table};
use crate::waiter::{FetchError, WaitTarget};

const KEY_RING_ID: &str = "KEY_RING_ID";

/// The `keyring` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("keyring", "Manage KMS key rings")
        .child(
            CommandNode::leaf("create", "Creates a KMS key ring", Create)
                .example(
                    "Create a KMS key ring",
                    "stackit beta kms keyring create --name my-keyring",
                )
                .example(
                    "Create a KMS key ring with a description",
                    "stackit beta kms keyring create --name my-keyring --description my-description",
                )
                .flag(FlagSpec::string("name", "Name of the key ring").required())
                .flag(FlagSpec::string("description", "Description of the key ring")),
        )
        .child(
            CommandNode::leaf("delete", "Deletes a KMS key ring", Delete)
                .example(
                    "Delete a KMS key ring",
                    "stackit beta kms keyring delete xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .arg(ArgSpec::uuid(KEY_RING_ID)),
        )
        .child(
            CommandNode::leaf("describe", "Describes a KMS key ring", Describe)
                .example(
                    "Describe a KMS key ring",
                    "stackit beta kms keyring describe xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .arg(ArgSpec::uuid(KEY_RING_ID)),
        )
        .child(
            CommandNode::leaf("list", "Lists all KMS key rings", List)
                .example("List all KMS key rings", "stackit beta kms keyring list")
                .example(
                    "List all KMS key rings in JSON format",
                    "stackit beta kms keyring list --output-format json",
                ),
        )
}

/// Input of `keyring create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    name: String,
    description: Option<String>,
}

/// `keyring create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = CreateInput;
    type Labels = String;
    type Request = Request<CreateKeyRingPayload, KeyRing>;
    type Response = KeyRing;

    fn parse(&self, inv: &Invocation) -> Result<CreateInput> {
        Ok(CreateInput {
            globals: inv.globals.clone(),
            name: inv.flags.required_string("name")?,
            description: inv.flags.string("description")?,
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &CreateInput) -> String {
        project_label(ctx, input.globals.project()).await
    }

    fn confirmation(&self, _input: &CreateInput, project: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to create a KMS key ring for project \"{project}\"?"
        ))
    }

    fn build_request(&self, ctx: &Context, input: &CreateInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .create_key_ring(input.globals.project(), &input.globals.region)
            .payload(CreateKeyRingPayload {
                display_name: input.name.clone(),
                description: input.description.clone(),
            }))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &CreateInput, request: Self::Request) -> Result<KeyRing> {
        let ring = request.execute().await.remote("create KMS key ring")?;
        require_id(&ring.id, "create KMS key ring", "key ring")?;
        Ok(ring)
    }

    fn waits(&self, _input: &CreateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &CreateInput, ring: &KeyRing) -> Result<()> {
        let target = WaitTarget::new(
            format!("key ring {}", ring.id),
            "wait for KMS key ring creation",
            "Creating key ring",
        );
        let kms = &ctx.clients.kms;
        let (project, region) = (input.globals.project(), input.globals.region.as_str());
        poll(
            ctx,
            &target,
            || {
                let request = kms.get_key_ring(project, region, &ring.id);
                async move { request.execute().await.map_err(FetchError::from) }
            },
            |ring: &KeyRing| creation_state(&ring.state, false),
            &wait_options(),
        )
        .await?;
        Ok(())
    }

    fn render(&self, printer: &Printer, input: &CreateInput, project: &String, ring: &KeyRing) -> Result<()> {
        printer.result(ring, |p| {
            p.outputln(&format!(
                "{} key ring for project \"{project}\". Key ring ID: {}",
                created(input.globals.async_mode),
                ring.id
            ))
        })
    }
}

/// Input of the commands addressing one key ring.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRingInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    key_ring_id: String,
}

impl KeyRingInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            key_ring_id: inv.arg(0)?.to_owned(),
        })
    }
}

/// `keyring delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = KeyRingInput;
    type Labels = String;
    type Request = Request<(), NoContent>;
    type Response = NoContent;

    fn parse(&self, inv: &Invocation) -> Result<KeyRingInput> {
        KeyRingInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &KeyRingInput) -> String {
        let request = ctx
            .clients
            .kms
            .get_key_ring(input.globals.project(), &input.globals.region, &input.key_ring_id);
        label_or(ctx, "key ring", &input.key_ring_id, async move {
            request.execute().await.map(|r| r.display_name)
        })
        .await
    }

    fn confirmation(&self, _input: &KeyRingInput, label: &String) -> Option<String> {
        Some(delete_prompt("key ring", label))
    }

    fn build_request(&self, ctx: &Context, input: &KeyRingInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .delete_key_ring(input.globals.project(), &input.globals.region, &input.key_ring_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &KeyRingInput, request: Self::Request) -> Result<NoContent> {
        request.execute().await.remote("delete KMS key ring")
    }

    fn render(&self, printer: &Printer, _input: &KeyRingInput, label: &String, _response: &NoContent) -> Result<()> {
        printer.info(format_args!("Deleted key ring \"{label}\""));
        Ok(())
    }
}

/// `keyring describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = KeyRingInput;
    type Labels = ();
    type Request = Request<(), KeyRing>;
    type Response = KeyRing;

    fn parse(&self, inv: &Invocation) -> Result<KeyRingInput> {
        KeyRingInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &KeyRingInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .get_key_ring(input.globals.project(), &input.globals.region, &input.key_ring_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &KeyRingInput, request: Self::Request) -> Result<KeyRing> {
        request.execute().await.remote("get KMS key ring")
    }

    fn render(&self, printer: &Printer, _input: &KeyRingInput, _labels: &(), ring: &KeyRing) -> Result<()> {
        printer.result(ring, |p| {
            let mut table = Table::key_value();
            table
                .add_pair("ID", &ring.id)
                .add_separator()
                .add_pair("NAME", &ring.display_name)
                .add_separator()
                .add_pair("STATE", &ring.state)
                .add_separator()
                .add_pair("DESCRIPTION", ring.description.as_deref())
                .add_separator()
                .add_pair("CREATED AT", Cell::time(ring.created_at));
            p.output(&table.render())
        })
    }
}

/// Input of `keyring list`.
#[derive(Debug, Clone, Serialize)]
pub struct ListInput {
    #[serde(flatten)]
    globals: GlobalFlags,
}

/// `keyring list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = ListInput;
    type Labels = ();
    type Request = Request<(), KeyRingList>;
    type Response = Vec<KeyRing>;

    fn parse(&self, inv: &Invocation) -> Result<ListInput> {
        Ok(ListInput {
            globals: inv.globals.clone(),
        })
    }

    fn build_request(&self, ctx: &Context, input: &ListInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .list_key_rings(input.globals.project(), &input.globals.region))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ListInput, request: Self::Request) -> Result<Vec<KeyRing>> {
        Ok(request.execute().await.remote("list KMS key rings")?.key_rings)
    }

    fn render(&self, printer: &Printer, input: &ListInput, _labels: &(), rings: &Vec<KeyRing>) -> Result<()> {
        printer.result(rings, |p| {
            if rings.is_empty() {
                p.info(format_args!(
                    "No key rings found for project \"{}\"",
                    input.globals.project()
                ));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["ID", "NAME", "STATUS"]);
            for ring in rings {
                table.add_row([
                    Cell::from(&ring.id),
                    Cell::from(&ring.display_name),
                    Cell::from(&ring.state),
                ]);
            }
            p.output(&table.render())
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stackit_sdk::Method;

    use crate::commands::testing::{PROJECT, Reply, Stub, run};

    const RING: &str = "11111111-1111-1111-1111-111111111111";

    fn rings_path() -> String {
        format!("/v1beta/projects/{PROJECT}/regions/eu01/keyrings")
    }

    #[tokio::test]
    async fn create_waits_until_active() {
        let ring_path = format!("{}/{RING}", rings_path());
        let stub = Stub::new()
            .json(Method::Get, &format!("/v2/projects/{PROJECT}"), json!({"name": "proj"}))
            .json(Method::Post, &rings_path(), json!({"id": RING, "displayName": "r", "state": "creating"}))
            .json(Method::Get, &ring_path, json!({"id": RING, "displayName": "r", "state": "active"}));
        let outcome = run(
            &stub,
            &["beta", "kms", "keyring", "create", "--project-id", PROJECT, "--name", "r", "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(
            outcome.out,
            format!("Created key ring for project \"proj\". Key ring ID: {RING}\n")
        );
        assert_eq!(stub.count(Method::Get, &ring_path), 1);
        assert_eq!(stub.body(Method::Post, &rings_path()), Some(json!({"displayName": "r"})));
    }

    #[tokio::test]
    async fn create_without_id_is_reported_after_dispatch() {
        let stub = Stub::new().json(Method::Post, &rings_path(), json!({"displayName": "r"}));
        let outcome = run(
            &stub,
            &["beta", "kms", "keyring", "create", "--project-id", PROJECT, "--name", "r", "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 1);
        assert!(outcome.err.contains("missing key ring ID"), "{}", outcome.err);
        assert!(outcome.err.contains("may have already taken effect"));
    }

    #[tokio::test]
    async fn delete_prompts_with_the_ring_name() {
        let ring_path = format!("{}/{RING}", rings_path());
        let stub = Stub::new()
            .json(Method::Get, &ring_path, json!({"id": RING, "displayName": "prod"}))
            .on(Method::Delete, &ring_path, Reply::Empty);
        let outcome = run(
            &stub,
            &["beta", "kms", "keyring", "delete", RING, "--project-id", PROJECT],
            "yes\n",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(
            outcome.err,
            "Are you sure you want to delete key ring \"prod\"? (This cannot be undone) [y/N] Deleted key ring \"prod\"\n"
        );
        assert_eq!(stub.count(Method::Delete, &ring_path), 1);
    }

    #[tokio::test]
    async fn list_renders_a_table() {
        let stub = Stub::new().json(
            Method::Get,
            &rings_path(),
            json!({"keyRings": [{"id": "a", "displayName": "one", "state": "active"}]}),
        );
        let outcome = run(&stub, &["beta", "kms", "keyring", "list", "--project-id", PROJECT], "").await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(outcome.out, "ID │ NAME │ STATUS\n───┼──────┼───────\na  │ one  │ active\n");
    }

    #[tokio::test]
    async fn describe_as_json() {
        let stub = Stub::new().json(
            Method::Get,
            &format!("{}/{RING}", rings_path()),
            json!({"id": RING, "displayName": "one", "state": "active"}),
        );
        let outcome = run(
            &stub,
            &["beta", "kms", "keyring", "describe", RING, "--project-id", PROJECT, "-o", "json"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        let value: serde_json::Value = serde_json::from_str(&outcome.out).expect("json");
        assert_eq!(value["displayName"], "one");
    }

    #[tokio::test]
    async fn remote_errors_name_the_operation() {
        let stub = Stub::new().on(Method::Get, &rings_path(), Reply::Status(500));
        let outcome = run(&stub, &["beta", "kms", "keyring", "list", "--project-id", PROJECT], "").await;
        assert_eq!(outcome.code, 1);
        assert_eq!(outcome.err, "Error: list KMS key rings: HTTP 500: no response body\n");
    }
}
