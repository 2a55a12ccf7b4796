//! `beta kms key`: keys inside a key ring.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use stackit_sdk::kms::{
    CreateKeyPayload, ImportKeyPayload, KEY_ALGORITHMS, KEY_PURPOSES, Key, KeyList, PROTECTIONS, Version,
};
use stackit_sdk::{NoContent, Request};

use super::{KEY_RING_FLAG, creation_state, key_ring_flag, wait_options};
use crate::builder::CommandNode;
use crate::commands::{created, delete_prompt, require_id};
use crate::error::{CliError, RemoteExt, Result};
use crate::flags::{ArgSpec, FlagError, FlagKind, FlagSpec};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation, label_or, poll, project_label};
use crate::printer::Printer;
use crate::table::{Cell, Table};
use crate::waiter::{FetchError, WaitTarget};

const KEY_ID: &str = "KEY_ID";
const WRAPPED_KEY_FLAG: &str = "wrapped-key";
const WRAPPING_KEY_ID_FLAG: &str = "wrapping-key-id";

/// Status reported for a key scheduled for deletion.
pub const DELETION_SCHEDULED: &str = "Deletion Scheduled";

/// The `key` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("key", "Manage KMS keys")
        .child(
            CommandNode::leaf("create", "Creates a KMS key", Create)
                .example(
                    "Create a symmetric KMS key",
                    "stackit beta kms key create --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --algorithm aes_256_gcm --name my-key --purpose symmetric_encrypt_decrypt",
                )
                .example(
                    "Create an import-only asymmetric KMS key",
                    "stackit beta kms key create --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --algorithm rsa_2048_oaep_sha256 --name my-key --purpose asymmetric_encrypt_decrypt --import-only",
                )
                .flag(key_ring_flag())
                .flag(
                    FlagSpec::enumeration("algorithm", KEY_ALGORITHMS, "En-/Decryption or signing algorithm")
                        .required(),
                )
                .flag(FlagSpec::string("name", "Display name of the key").required())
                .flag(FlagSpec::enumeration("purpose", KEY_PURPOSES, "Purpose of the key").required())
                .flag(FlagSpec::string("description", "Description of the key"))
                .flag(FlagSpec::enumeration(
                    "protection",
                    PROTECTIONS,
                    "System protecting the key material",
                ))
                .flag(FlagSpec::bool(
                    "import-only",
                    "Create the key without material; versions must be imported",
                )),
        )
        .child(
            CommandNode::leaf("delete", "Schedules a KMS key for deletion", Delete)
                .example(
                    "Delete a KMS key",
                    "stackit beta kms key delete yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .arg(ArgSpec::uuid(KEY_ID))
                .flag(key_ring_flag()),
        )
        .child(
            CommandNode::leaf("describe", "Describes a KMS key", Describe)
                .example(
                    "Describe a KMS key",
                    "stackit beta kms key describe yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .arg(ArgSpec::uuid(KEY_ID))
                .flag(key_ring_flag()),
        )
        .child(
            CommandNode::leaf("list", "Lists all keys of a KMS key ring", List)
                .example(
                    "List all keys of a key ring",
                    "stackit beta kms key list --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .flag(key_ring_flag()),
        )
        .child(
            CommandNode::leaf("import", "Imports a new version of a KMS key", Import)
                .example(
                    "Import wrapped key material",
                    "stackit beta kms key import yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --wrapped-key base64-material --wrapping-key-id zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz",
                )
                .example(
                    "Import wrapped key material from a file",
                    "stackit beta kms key import yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx --wrapped-key @./wrapped.b64 --wrapping-key-id zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz",
                )
                .arg(ArgSpec::uuid(KEY_ID))
                .flag(key_ring_flag())
                .flag(
                    FlagSpec::new(
                        WRAPPED_KEY_FLAG,
                        FlagKind::ReadFromFile,
                        "Base64 encoded wrapped key material",
                    )
                    .required(),
                )
                .flag(
                    FlagSpec::uuid(
                        WRAPPING_KEY_ID_FLAG,
                        "ID of the wrapping key the material was wrapped with",
                    )
                    .required(),
                ),
        )
        .child(
            CommandNode::leaf("restore", "Restores a KMS key scheduled for deletion", Restore)
                .example(
                    "Restore a KMS key",
                    "stackit beta kms key restore yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .arg(ArgSpec::uuid(KEY_ID))
                .flag(key_ring_flag()),
        )
        .child(
            CommandNode::leaf("rotate", "Rotates a KMS key to a new version", Rotate)
                .example(
                    "Rotate a KMS key",
                    "stackit beta kms key rotate yyyyyyyy-yyyy-yyyy-yyyy-yyyyyyyyyyyy --key-ring xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
                )
                .arg(ArgSpec::uuid(KEY_ID))
                .flag(key_ring_flag()),
        )
}

/// Input of `key create`.
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
    import_only: bool,
}

/// `key create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = CreateInput;
    type Labels = String;
    type Request = Request<CreateKeyPayload, Key>;
    type Response = Key;

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
            import_only: flags.bool("import-only")?,
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &CreateInput) -> String {
        project_label(ctx, input.globals.project()).await
    }

    fn confirmation(&self, _input: &CreateInput, _project: &String) -> Option<String> {
        Some("Are you sure you want to create a KMS Key?".to_owned())
    }

    fn build_request(&self, ctx: &Context, input: &CreateInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .create_key(input.globals.project(), &input.globals.region, &input.key_ring_id)
            .payload(CreateKeyPayload {
                display_name: input.name.clone(),
                description: input.description.clone(),
                algorithm: input.algorithm.to_owned(),
                purpose: input.purpose.to_owned(),
                protection: input.protection.map(str::to_owned),
                import_only: input.import_only,
            }))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &CreateInput, request: Self::Request) -> Result<Key> {
        let key = request.execute().await.remote("create KMS key")?;
        require_id(&key.id, "create KMS key", "key")?;
        Ok(key)
    }

    fn waits(&self, _input: &CreateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &CreateInput, key: &Key) -> Result<()> {
        let target = WaitTarget::new(format!("key {}", key.id), "wait for KMS key creation", "Creating key");
        let kms = &ctx.clients.kms;
        let (project, region) = (input.globals.project(), input.globals.region.as_str());
        let import_only = input.import_only;
        poll(
            ctx,
            &target,
            || {
                let request = kms.get_key(project, region, &input.key_ring_id, &key.id);
                async move { request.execute().await.map_err(FetchError::from) }
            },
            move |key: &Key| creation_state(&key.state, import_only || key.import_only),
            &wait_options(),
        )
        .await?;
        Ok(())
    }

    fn render(&self, printer: &Printer, input: &CreateInput, project: &String, key: &Key) -> Result<()> {
        printer.result(key, |p| {
            p.outputln(&format!(
                "{} Key for project \"{project}\". Key ID: {}",
                created(input.globals.async_mode),
                key.id
            ))
        })
    }
}

/// Input of the commands addressing one key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    key_ring_id: String,
    key_id: String,
}

impl KeyInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            key_ring_id: inv.flags.required_uuid(KEY_RING_FLAG)?,
            key_id: inv.arg(0)?.to_owned(),
        })
    }

    async fn key_label(&self, ctx: &Context) -> String {
        let request = ctx
            .clients
            .kms
            .get_key(self.globals.project(), &self.globals.region, &self.key_ring_id, &self.key_id);
        label_or(ctx, "key", &self.key_id, async move {
            request.execute().await.map(|k| k.display_name)
        })
        .await
    }

    fn get(&self, ctx: &Context) -> Request<(), Key> {
        ctx.clients
            .kms
            .get_key(self.globals.project(), &self.globals.region, &self.key_ring_id, &self.key_id)
    }
}

/// Result of `key delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDeletion {
    key_id: String,
    key_name: String,
    status: &'static str,
    deletion_date: DateTime<Utc>,
}

/// `key delete`. Deletion is scheduled by the service, so nothing is awaited.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = KeyInput;
    type Labels = String;
    type Request = Request<(), NoContent>;
    type Response = KeyDeletion;

    fn parse(&self, inv: &Invocation) -> Result<KeyInput> {
        KeyInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &KeyInput) -> String {
        input.key_label(ctx).await
    }

    fn confirmation(&self, _input: &KeyInput, key: &String) -> Option<String> {
        Some(delete_prompt("key", key))
    }

    fn build_request(&self, ctx: &Context, input: &KeyInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .delete_key(input.globals.project(), &input.globals.region, &input.key_ring_id, &input.key_id))
    }

    async fn dispatch(&self, ctx: &Context, input: &KeyInput, request: Self::Request) -> Result<KeyDeletion> {
        request.execute().await.remote("delete KMS key")?;
        let key = input
            .get(ctx)
            .execute()
            .await
            .remote("get KMS key deletion date")
            .map_err(CliError::after_dispatch)?;
        let deletion_date = key.deletion_date.ok_or_else(|| {
            CliError::OperationFailed {
                operation: "get KMS key deletion date".to_owned(),
                reason: "the key has no deletion date".to_owned(),
            }
            .after_dispatch()
        })?;
        Ok(KeyDeletion {
            key_id: input.key_id.clone(),
            key_name: String::new(),
            status: DELETION_SCHEDULED,
            deletion_date,
        })
    }

    fn render(&self, printer: &Printer, _input: &KeyInput, key: &String, deletion: &KeyDeletion) -> Result<()> {
        let deletion = KeyDeletion {
            key_name: key.clone(),
            ..deletion.clone()
        };
        printer.result(&deletion, |p| {
            p.outputln(&format!(
                "Deletion of KMS Key \"{key}\" scheduled successfully for the deletion date: \"{}\"",
                deletion.deletion_date.to_rfc3339_opts(SecondsFormat::Secs, true)
            ))
        })
    }
}

/// `key describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = KeyInput;
    type Labels = ();
    type Request = Request<(), Key>;
    type Response = Key;

    fn parse(&self, inv: &Invocation) -> Result<KeyInput> {
        KeyInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &KeyInput) -> Result<Self::Request> {
        Ok(input.get(ctx))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &KeyInput, request: Self::Request) -> Result<Key> {
        request.execute().await.remote("get KMS key")
    }

    fn render(&self, printer: &Printer, _input: &KeyInput, _labels: &(), key: &Key) -> Result<()> {
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
                .add_pair("IMPORT ONLY", key.import_only)
                .add_separator()
                .add_pair("KEY RING ID", &key.key_ring_id)
                .add_separator()
                .add_pair("DELETION DATE", Cell::time(key.deletion_date))
                .add_separator()
                .add_pair("CREATED AT", Cell::time(key.created_at));
            p.output(&table.render())
        })
    }
}

/// Input of `key list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    key_ring_id: String,
}

/// `key list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = ListInput;
    type Labels = ();
    type Request = Request<(), KeyList>;
    type Response = Vec<Key>;

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
            .list_keys(input.globals.project(), &input.globals.region, &input.key_ring_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ListInput, request: Self::Request) -> Result<Vec<Key>> {
        Ok(request.execute().await.remote("list KMS keys")?.keys)
    }

    fn render(&self, printer: &Printer, input: &ListInput, _labels: &(), keys: &Vec<Key>) -> Result<()> {
        printer.result(keys, |p| {
            if keys.is_empty() {
                p.info(format_args!("No keys found for key ring \"{}\"", input.key_ring_id));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["ID", "NAME", "PURPOSE", "ALGORITHM", "DELETION DATE", "STATUS"]);
            for key in keys {
                table.add_row([
                    Cell::from(&key.id),
                    Cell::from(&key.display_name),
                    Cell::from(&key.purpose),
                    Cell::from(&key.algorithm),
                    Cell::time(key.deletion_date),
                    Cell::from(&key.state),
                ]);
            }
            p.output(&table.render())
        })
    }
}

/// Input of `key import`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportInput {
    #[serde(flatten)]
    key: KeyInput,
    wrapped_key: String,
    wrapping_key_id: String,
}

/// Names of the key and its key ring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyLabels {
    key: String,
    key_ring: String,
}

/// `key import`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Import;

#[async_trait]
impl Operation for Import {
    type Input = ImportInput;
    type Labels = KeyLabels;
    type Request = Request<ImportKeyPayload, Version>;
    type Response = Version;

    fn parse(&self, inv: &Invocation) -> Result<ImportInput> {
        let wrapped_key = inv
            .flags
            .read_from_file(WRAPPED_KEY_FLAG)?
            .map(|raw| raw.trim().to_owned())
            .unwrap_or_default();
        STANDARD
            .decode(&wrapped_key)
            .map_err(|e| FlagError::InvalidBase64(e.to_string()).for_flag(WRAPPED_KEY_FLAG))?;
        Ok(ImportInput {
            key: KeyInput::parse(inv)?,
            wrapped_key,
            wrapping_key_id: inv.flags.required_uuid(WRAPPING_KEY_ID_FLAG)?,
        })
    }

    fn validate(&self, input: &ImportInput) -> Result<()> {
        if input.wrapped_key.is_empty() {
            return Err(CliError::flag_validation(
                WRAPPED_KEY_FLAG,
                "the wrapped key is required and must be base64 encoded",
            ));
        }
        Ok(())
    }

    async fn resolve_labels(&self, ctx: &Context, input: &ImportInput) -> KeyLabels {
        let key = &input.key;
        let ring = ctx
            .clients
            .kms
            .get_key_ring(key.globals.project(), &key.globals.region, &key.key_ring_id);
        KeyLabels {
            key: key.key_label(ctx).await,
            key_ring: label_or(ctx, "key ring", &key.key_ring_id, async move {
                ring.execute().await.map(|r| r.display_name)
            })
            .await,
        }
    }

    fn confirmation(&self, _input: &ImportInput, labels: &KeyLabels) -> Option<String> {
        Some(format!(
            "Are you sure you want to import a new version for the KMS Key \"{}\" inside the key ring \"{}\"?",
            labels.key, labels.key_ring
        ))
    }

    fn build_request(&self, ctx: &Context, input: &ImportInput) -> Result<Self::Request> {
        let key = &input.key;
        Ok(ctx
            .clients
            .kms
            .import_key(key.globals.project(), &key.globals.region, &key.key_ring_id, &key.key_id)
            .payload(ImportKeyPayload {
                wrapped_key: input.wrapped_key.clone(),
                wrapping_key_id: input.wrapping_key_id.clone(),
            }))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ImportInput, request: Self::Request) -> Result<Version> {
        request.execute().await.remote("import KMS key")
    }

    fn render(&self, printer: &Printer, _input: &ImportInput, labels: &KeyLabels, version: &Version) -> Result<()> {
        printer.result(version, |p| {
            p.outputln(&format!(
                "Imported a new version for the key \"{}\" inside the key ring \"{}\"",
                labels.key, labels.key_ring
            ))
        })
    }
}

/// `key restore`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Restore;

#[async_trait]
impl Operation for Restore {
    type Input = KeyInput;
    type Labels = String;
    type Request = Request<(), NoContent>;
    type Response = Key;

    fn parse(&self, inv: &Invocation) -> Result<KeyInput> {
        KeyInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &KeyInput) -> String {
        input.key_label(ctx).await
    }

    fn confirmation(&self, _input: &KeyInput, key: &String) -> Option<String> {
        Some(format!("Are you sure you want to restore the KMS key \"{key}\"?"))
    }

    fn build_request(&self, ctx: &Context, input: &KeyInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .restore_key(input.globals.project(), &input.globals.region, &input.key_ring_id, &input.key_id))
    }

    async fn dispatch(&self, ctx: &Context, input: &KeyInput, request: Self::Request) -> Result<Key> {
        request.execute().await.remote("restore KMS key")?;
        input
            .get(ctx)
            .execute()
            .await
            .remote("get KMS key")
            .map_err(CliError::after_dispatch)
    }

    fn render(&self, printer: &Printer, _input: &KeyInput, label: &String, key: &Key) -> Result<()> {
        printer.result(key, |p| p.outputln(&format!("Restored the KMS key \"{label}\"")))
    }
}

/// `key rotate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rotate;

#[async_trait]
impl Operation for Rotate {
    type Input = KeyInput;
    type Labels = String;
    type Request = Request<(), Version>;
    type Response = Version;

    fn parse(&self, inv: &Invocation) -> Result<KeyInput> {
        KeyInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &KeyInput) -> String {
        input.key_label(ctx).await
    }

    fn confirmation(&self, _input: &KeyInput, key: &String) -> Option<String> {
        Some(format!("Are you sure you want to rotate the KMS key \"{key}\"?"))
    }

    fn build_request(&self, ctx: &Context, input: &KeyInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .kms
            .rotate_key(input.globals.project(), &input.globals.region, &input.key_ring_id, &input.key_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &KeyInput, request: Self::Request) -> Result<Version> {
        request.execute().await.remote("rotate KMS key")
    }

    fn waits(&self, _input: &KeyInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &KeyInput, version: &Version) -> Result<()> {
        let target = WaitTarget::new(
            format!("version {} of key {}", version.number, input.key_id),
            "wait for KMS key rotation",
            "Rotating key",
        );
        let kms = &ctx.clients.kms;
        let (project, region) = (input.globals.project(), input.globals.region.as_str());
        poll(
            ctx,
            &target,
            || {
                let request = kms.get_version(project, region, &input.key_ring_id, &input.key_id, version.number);
                async move { request.execute().await.map_err(FetchError::from) }
            },
            |version: &Version| creation_state(&version.state, false),
            &wait_options(),
        )
        .await?;
        Ok(())
    }

    fn render(&self, printer: &Printer, input: &KeyInput, label: &String, version: &Version) -> Result<()> {
        let verb = if input.globals.async_mode { "Triggered rotation of" } else { "Rotated" };
        printer.result(version, |p| {
            p.outputln(&format!(
                "{verb} the KMS key \"{label}\". New version: {}",
                version.number
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stackit_sdk::Method;

    use crate::commands::testing::{PROJECT, Reply, Stub, run};

    const RING: &str = "11111111-1111-1111-1111-111111111111";
    const KEY: &str = "22222222-2222-2222-2222-222222222222";
    const WRAPPING: &str = "33333333-3333-3333-3333-333333333333";

    fn keys_path() -> String {
        format!("/v1beta/projects/{PROJECT}/regions/eu01/keyrings/{RING}/keys")
    }

    fn key_path() -> String {
        format!("{}/{KEY}", keys_path())
    }

    #[tokio::test]
    async fn create_in_async_mode_does_not_poll() {
        let stub = Stub::new()
            .json(Method::Get, &format!("/v2/projects/{PROJECT}"), json!({"name": "proj-label"}))
            .json(Method::Post, &keys_path(), json!({"id": KEY, "displayName": "k", "state": "creating"}));
        let outcome = run(
            &stub,
            &[
                "beta", "kms", "key", "create", "--project-id", PROJECT, "--key-ring", RING, "--algorithm",
                "aes_256_gcm", "--name", "k", "--purpose", "symmetric_encrypt_decrypt", "--async", "-y",
            ],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(
            outcome.out,
            format!("Triggered creation of Key for project \"proj-label\". Key ID: {KEY}\n")
        );
        assert_eq!(stub.count(Method::Get, &key_path()), 0);
        let body = stub.body(Method::Post, &keys_path()).expect("payload");
        assert_eq!(body["algorithm"], "aes_256_gcm");
        assert_eq!(body["importOnly"], false);
    }

    #[tokio::test]
    async fn import_only_keys_settle_without_material() {
        let stub = Stub::new()
            .json(Method::Post, &keys_path(), json!({"id": KEY, "state": "creating", "importOnly": true}))
            .json(Method::Get, &key_path(), json!({"id": KEY, "state": "version_not_ready", "importOnly": true}));
        let outcome = run(
            &stub,
            &[
                "beta", "kms", "key", "create", "--project-id", PROJECT, "--key-ring", RING, "--algorithm",
                "rsa_2048_oaep_sha256", "--name", "k", "--purpose", "asymmetric_encrypt_decrypt",
                "--import-only", "-y",
            ],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(stub.count(Method::Get, &key_path()), 1);
    }

    #[tokio::test]
    async fn create_rejects_unknown_algorithms() {
        let stub = Stub::new();
        let outcome = run(
            &stub,
            &[
                "beta", "kms", "key", "create", "--project-id", PROJECT, "--key-ring", RING, "--algorithm",
                "rot13", "--name", "k", "--purpose", "symmetric_encrypt_decrypt", "-y",
            ],
            "",
        )
        .await;
        assert_eq!(outcome.code, 1);
        assert!(outcome.err.contains("--algorithm is invalid"), "{}", outcome.err);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_the_scheduled_date() {
        let stub = Stub::new()
            .json(Method::Get, &key_path(), json!({"id": KEY, "displayName": "my-key", "state": "active"}))
            .json(
                Method::Get,
                &key_path(),
                json!({"id": KEY, "displayName": "my-key", "state": "deleted", "deletionDate": "2026-11-17T10:00:00Z"}),
            )
            .on(Method::Delete, &key_path(), Reply::Empty);
        let outcome = run(
            &stub,
            &["beta", "kms", "key", "delete", KEY, "--key-ring", RING, "--project-id", PROJECT, "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(
            outcome.out,
            "Deletion of KMS Key \"my-key\" scheduled successfully for the deletion date: \"2026-11-17T10:00:00Z\"\n"
        );
    }

    #[tokio::test]
    async fn delete_as_json_has_the_schedule_fields() {
        let stub = Stub::new()
            .json(
                Method::Get,
                &key_path(),
                json!({"id": KEY, "displayName": "my-key", "deletionDate": "2026-11-17T10:00:00Z"}),
            )
            .on(Method::Delete, &key_path(), Reply::Empty);
        let outcome = run(
            &stub,
            &[
                "beta", "kms", "key", "delete", KEY, "--key-ring", RING, "--project-id", PROJECT, "-y", "-o", "json",
            ],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        let value: serde_json::Value = serde_json::from_str(&outcome.out).expect("json");
        assert_eq!(
            value,
            json!({
                "keyId": KEY,
                "keyName": "my-key",
                "status": "Deletion Scheduled",
                "deletionDate": "2026-11-17T10:00:00Z",
            })
        );
    }

    #[tokio::test]
    async fn import_rejects_material_that_is_not_base64() {
        let stub = Stub::new();
        let outcome = run(
            &stub,
            &[
                "beta", "kms", "key", "import", KEY, "--key-ring", RING, "--project-id", PROJECT, "--wrapped-key",
                "not base64!", "--wrapping-key-id", WRAPPING, "-y",
            ],
            "",
        )
        .await;
        assert_eq!(outcome.code, 1);
        assert!(outcome.err.contains("--wrapped-key is invalid: invalid base64"), "{}", outcome.err);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn import_names_key_and_ring() {
        let ring_path = format!("/v1beta/projects/{PROJECT}/regions/eu01/keyrings/{RING}");
        let stub = Stub::new()
            .json(Method::Get, &key_path(), json!({"id": KEY, "displayName": "my-key"}))
            .json(Method::Get, &ring_path, json!({"id": RING, "displayName": "my-ring"}))
            .json(Method::Post, &format!("{}/import", key_path()), json!({"number": 2, "keyId": KEY}));
        let outcome = run(
            &stub,
            &[
                "beta", "kms", "key", "import", KEY, "--key-ring", RING, "--project-id", PROJECT, "--wrapped-key",
                "aGVsbG8=", "--wrapping-key-id", WRAPPING,
            ],
            "y\n",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(
            outcome.out,
            "Imported a new version for the key \"my-key\" inside the key ring \"my-ring\"\n"
        );
        assert_eq!(
            stub.body(Method::Post, &format!("{}/import", key_path())),
            Some(json!({"wrappedKey": "aGVsbG8=", "wrappingKeyId": WRAPPING}))
        );
    }

    #[tokio::test]
    async fn rotate_waits_for_the_new_version() {
        let version_path = format!("{}/versions/3", key_path());
        let stub = Stub::new()
            .json(Method::Get, &key_path(), json!({"id": KEY, "displayName": "my-key"}))
            .json(Method::Post, &format!("{}/rotate", key_path()), json!({"number": 3, "state": "creating"}))
            .json(Method::Get, &version_path, json!({"number": 3, "state": "active"}));
        let outcome = run(
            &stub,
            &["beta", "kms", "key", "rotate", KEY, "--key-ring", RING, "--project-id", PROJECT, "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(outcome.out, "Rotated the KMS key \"my-key\". New version: 3\n");
        assert_eq!(stub.count(Method::Get, &version_path), 1);
    }

    #[tokio::test]
    async fn list_with_none_output_prints_nothing() {
        let stub = Stub::new().json(Method::Get, &keys_path(), json!({"keys": [{"id": KEY}]}));
        let outcome = run(
            &stub,
            &["beta", "kms", "key", "list", "--key-ring", RING, "--project-id", PROJECT, "-o", "none"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert!(outcome.out.is_empty());
    }
}
