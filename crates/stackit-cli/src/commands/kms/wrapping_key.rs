//! `beta kms wrapping-key`: keys used to wrap material for import.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::kms::{CreateWrappingKeyPayload, PROTECTIONS, WRAPPING_ALGORITHMS, WRAPPING_PURPOSES, WrappingKey, WrappingKeyList};
use stackit_sdk::{NoContent, Request};

use super::{KEY_RING_FLAG, creation_state, key_ring_flag, wait_options};
use crate::builder::CommandNode;
use crate::commands::{created, delete_prompt, require_id};
use crate::error::{RemoteExt, Result};
use crate::flags::{ArgSpec, FlagSpec};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation, label_or, poll, project_label};
use crate::printer::Printer;
use crate::table::{Cell, Table};
use crate::waiter::{FetchError, WaitTarget};

const WRAPPING_KEY_ID: &str = "WRAPPING_KEY_ID";

/// The `wrapping-key` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("wrapping-key", "Manage KMS wrapping keys")
        .child(
            CommandNode::leaf("create", "Creates a KMS wrapping key", Create)
                .example(
                    "Create a wrapping key for symmetric key material",
                    "stackit beta kms wrapping-key create --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --algorithm rsa_2048_oaep_sha256 --name my-wrapping-key --purpose wrap_symmetric_key",
                )
                .flag(key_ring_flag())
                .flag(
                    FlagSpec::enumeration("algorithm", WRAPPING_ALGORITHMS, "Wrapping algorithm").required(),
                )
                .flag(FlagSpec::string("name", "Display name of the wrapping key").required())
                .flag(FlagSpec::enumeration("purpose", WRAPPING_PURPOSES, "Purpose of the wrapping key").required())
                .flag(FlagSpec::string("description", "Description of the wrapping key"))
                .flag(FlagSpec::enumeration(
                    "protection",
                    PROTECTIONS,
                    "System protecting the key material",
                )),
        )
        .child(
            CommandNode::leaf("delete", "Deletes a KMS wrapping key", Delete)
                .example(
                    "Delete a wrapping key",
                    "stackit beta kms wrapping-key delete zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .arg(ArgSpec::uuid(WRAPPING_KEY_ID))
                .flag(key_ring_flag()),
        )
        .child(
            CommandNode::leaf("describe", "Describes a KMS wrapping key", Describe)
                .example(
                    "Describe a wrapping key",
                    "stackit beta kms wrapping-key describe zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .arg(ArgSpec::uuid(WRAPPING_KEY_ID))
                .flag(key_ring_flag()),
        )
        .child(
            CommandNode::leaf("list", "Lists all wrapping keys of a KMS key ring", List)
                .example(
                    "List all wrapping keys of a key ring",
                    "stackit beta kms wrapping-key list --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .flag(key_ring_flag()),
        )
}

/// Input of `wrapping-key create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    key_ring_id: String,
    algorithm: &'static str,
    name: String,
    purpose: &'static str,
    description: Option<String>,
    protection: Option<&'static str>,
}

/// `wrapping-key create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = CreateInput;
    type Labels = String;
    type Request = Request<CreateWrappingKeyPayload, WrappingKey>;
    type Response = WrappingKey;

    fn parse(&self, inv: &Invocation) -> Result<CreateInput> {
        let flags = &inv.flags;
        Ok(CreateInput {
            globals: inv.globals.clone(),
            key_ring_id: flags.required_uuid(KEY_RING_FLAG)?,
            algorithm: flags.required_enumeration("algorithm")?,
            name: flags.required_string("name")?,
            purpose: flags.required_enumeration("purpose")?,
            description: flags.string("description")?,
            protection: flags.enumeration("protection")?,
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &CreateInput) -> String {
        project_label(ctx, input.globals.project()).await
    }

    fn confirmation(&self, _input: &CreateInput, project: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to create a KMS wrapping key for project \"{project}\"?"
        ))
    }

    fn build_request(&self, ctx: &Context, input: &CreateInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .create_wrapping_key(input.globals.project(), &input.globals.region, &input.key_ring_id)
            .payload(CreateWrappingKeyPayload {
                display_name: input.name.clone(),
                description: input.description.clone(),
                algorithm: input.algorithm.to_owned(),
                purpose: input.purpose.to_owned(),
                protection: input.protection.map(str::to_owned),
            }))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &CreateInput, request: Self::Request) -> Result<WrappingKey> {
        let key = request.execute().await.remote("create KMS wrapping key")?;
        require_id(&key.id, "create KMS wrapping key", "wrapping key")?;
        Ok(key)
    }

    fn waits(&self, _input: &CreateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &CreateInput, key: &WrappingKey) -> Result<()> {
        let target = WaitTarget::new(
            format!("wrapping key {}", key.id),
            "wait for KMS wrapping key creation",
            "Creating wrapping key",
        );
        let kms = &ctx.clients.kms;
        let (project, region) = (input.globals.project(), input.globals.region.as_str());
        poll(
            ctx,
            &target,
            || {
                let request = kms.get_wrapping_key(project, region, &input.key_ring_id, &key.id);
                async move { request.execute().await.map_err(FetchError::from) }
            },
            |key: &WrappingKey| creation_state(&key.state, false),
            &wait_options(),
        )
        .await?;
        Ok(())
    }

    fn render(&self, printer: &Printer, input: &CreateInput, project: &String, key: &WrappingKey) -> Result<()> {
        printer.result(key, |p| {
            p.outputln(&format!(
                "{} wrapping key for project \"{project}\". Wrapping key ID: {}",
                created(input.globals.async_mode),
                key.id
            ))
        })
    }
}

/// Input of the commands addressing one wrapping key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappingKeyInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    key_ring_id: String,
    wrapping_key_id: String,
}

impl WrappingKeyInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            key_ring_id: inv.flags.required_uuid(KEY_RING_FLAG)?,
            wrapping_key_id: inv.arg(0)?.to_owned(),
        })
    }

    fn get(&self, ctx: &Context) -> Request<(), WrappingKey> {
        ctx.clients.kms.get_wrapping_key(
            self.globals.project(),
            &self.globals.region,
            &self.key_ring_id,
            &self.wrapping_key_id,
        )
    }
}

/// `wrapping-key delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = WrappingKeyInput;
    type Labels = String;
    type Request = Request<(), NoContent>;
    type Response = NoContent;

    fn parse(&self, inv: &Invocation) -> Result<WrappingKeyInput> {
        WrappingKeyInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &WrappingKeyInput) -> String {
        let request = input.get(ctx);
        label_or(ctx, "wrapping key", &input.wrapping_key_id, async move {
            request.execute().await.map(|k| k.display_name)
        })
        .await
    }

    fn confirmation(&self, _input: &WrappingKeyInput, label: &String) -> Option<String> {
        Some(delete_prompt("wrapping key", label))
    }

    fn build_request(&self, ctx: &Context, input: &WrappingKeyInput) -> Result<Self::Request> {
        Ok(ctx.clients.kms.delete_wrapping_key(
            input.globals.project(),
            &input.globals.region,
            &input.key_ring_id,
            &input.wrapping_key_id,
        ))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &WrappingKeyInput, request: Self::Request) -> Result<NoContent> {
        request.execute().await.remote("delete KMS wrapping key")
    }

    fn render(&self, printer: &Printer, _input: &WrappingKeyInput, label: &String, _response: &NoContent) -> Result<()> {
        printer.info(format_args!("Deleted wrapping key \"{label}\""));
        Ok(())
    }
}

/// `wrapping-key describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = WrappingKeyInput;
    type Labels = ();
    type Request = Request<(), WrappingKey>;
    type Response = WrappingKey;

    fn parse(&self, inv: &Invocation) -> Result<WrappingKeyInput> {
        WrappingKeyInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &WrappingKeyInput) -> Result<Self::Request> {
        Ok(input.get(ctx))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &WrappingKeyInput, request: Self::Request) -> Result<WrappingKey> {
        request.execute().await.remote("get KMS wrapping key")
    }

    fn render(&self, printer: &Printer, _input: &WrappingKeyInput, _labels: &(), key: &WrappingKey) -> Result<()> {
        printer.result(key, |p| {
            let mut table = Table::key_value();
            table
                .add_pair("ID", &key.id)
                .add_separator()
                .add_pair("NAME", &key.display_name)
                .add_separator()
                .add_pair("DESCRIPTION", key.description.as_deref())
                .add_separator()
                .add_pair("STATE", &key.state)
                .add_separator()
                .add_pair("ALGORITHM", &key.algorithm)
                .add_separator()
                .add_pair("PURPOSE", &key.purpose)
                .add_separator()
                .add_pair("PROTECTION", key.protection.as_deref())
                .add_separator()
                .add_pair("KEY RING ID", &key.key_ring_id)
                .add_separator()
                .add_pair("PUBLIC KEY", key.public_key.as_deref())
                .add_separator()
                .add_pair("EXPIRES AT", Cell::time(key.expires_at))
                .add_separator()
                .add_pair("CREATED AT", Cell::time(key.created_at));
            p.output(&table.render())
        })
    }
}

/// Input of `wrapping-key list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    key_ring_id: String,
}

/// `wrapping-key list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = ListInput;
    type Labels = ();
    type Request = Request<(), WrappingKeyList>;
    type Response = Vec<WrappingKey>;

    fn parse(&self, inv: &Invocation) -> Result<ListInput> {
        Ok(ListInput {
            globals: inv.globals.clone(),
            key_ring_id: inv.flags.required_uuid(KEY_RING_FLAG)?,
        })
    }

    fn build_request(&self, ctx: &Context, input: &ListInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .list_wrapping_keys(input.globals.project(), &input.globals.region, &input.key_ring_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ListInput, request: Self::Request) -> Result<Vec<WrappingKey>> {
        Ok(request.execute().await.remote("list KMS wrapping keys")?.wrapping_keys)
    }

    fn render(&self, printer: &Printer, input: &ListInput, _labels: &(), keys: &Vec<WrappingKey>) -> Result<()> {
        printer.result(keys, |p| {
            if keys.is_empty() {
                p.info(format_args!("No wrapping keys found for key ring \"{}\"", input.key_ring_id));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["ID", "NAME", "PURPOSE", "ALGORITHM", "EXPIRES AT", "STATUS"]);
            for key in keys {
                table.add_row([
                    Cell::from(&key.id),
                    Cell::from(&key.display_name),
                    Cell::from(&key.purpose),
                    Cell::from(&key.algorithm),
                    Cell::time(key.expires_at),
                    Cell::from(&key.state),
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
    const WRAPPING: &str = "33333333-3333-3333-3333-333333333333";

    fn wrapping_keys_path() -> String {
        format!("/v1beta/projects/{PROJECT}/regions/eu01/keyrings/{RING}/wrappingkeys")
    }

    #[tokio::test]
    async fn create_waits_and_prints_the_id() {
        let key_path = format!("{}/{WRAPPING}", wrapping_keys_path());
        let stub = Stub::new()
            .json(Method::Get, &format!("/v2/projects/{PROJECT}"), json!({"name": "proj"}))
            .json(Method::Post, &wrapping_keys_path(), json!({"id": WRAPPING, "state": "creating"}))
            .json(Method::Get, &key_path, json!({"id": WRAPPING, "state": "active"}));
        let outcome = run(
            &stub,
            &[
                "beta", "kms", "wrapping-key", "create", "--project-id", PROJECT, "--key-ring", RING, "--algorithm",
                "rsa_2048_oaep_sha256", "--name", "w", "--purpose", "wrap_symmetric_key", "-y",
            ],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(
            outcome.out,
            format!("Created wrapping key for project \"proj\". Wrapping key ID: {WRAPPING}\n")
        );
        assert_eq!(stub.count(Method::Get, &key_path), 1);
    }

    #[tokio::test]
    async fn failed_creation_is_reported_with_the_state() {
        let key_path = format!("{}/{WRAPPING}", wrapping_keys_path());
        let stub = Stub::new()
            .json(Method::Post, &wrapping_keys_path(), json!({"id": WRAPPING, "state": "creating"}))
            .json(Method::Get, &key_path, json!({"id": WRAPPING, "state": "key_material_unavailable"}));
        let outcome = run(
            &stub,
            &[
                "beta", "kms", "wrapping-key", "create", "--project-id", PROJECT, "--key-ring", RING, "--algorithm",
                "rsa_2048_oaep_sha256", "--name", "w", "--purpose", "wrap_symmetric_key", "-y",
            ],
            "",
        )
        .await;
        assert_eq!(outcome.code, 1);
        assert!(outcome.err.contains("key_material_unavailable"), "{}", outcome.err);
        assert!(outcome.err.contains("may have already taken effect"), "{}", outcome.err);
        assert!(outcome.out.is_empty());
    }

    #[tokio::test]
    async fn declined_delete_sends_nothing() {
        let key_path = format!("{}/{WRAPPING}", wrapping_keys_path());
        let stub = Stub::new()
            .json(Method::Get, &key_path, json!({"id": WRAPPING, "displayName": "w"}))
            .on(Method::Delete, &key_path, Reply::Empty);
        let outcome = run(
            &stub,
            &["beta", "kms", "wrapping-key", "delete", WRAPPING, "--key-ring", RING, "--project-id", PROJECT],
            "n\n",
        )
        .await;
        assert_eq!(outcome.code, 1);
        assert_eq!(stub.count(Method::Delete, &key_path), 0);
    }

    #[tokio::test]
    async fn empty_list_goes_to_stderr() {
        let stub = Stub::new().json(Method::Get, &wrapping_keys_path(), json!({"wrappingKeys": []}));
        let outcome = run(
            &stub,
            &["beta", "kms", "wrapping-key", "list", "--key-ring", RING, "--project-id", PROJECT],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert!(outcome.out.is_empty());
        assert_eq!(outcome.err, format!("No wrapping keys found for key ring \"{RING}\"\n"));
    }
}
