//! `observability scrape-config`: Prometheus scrape jobs of an instance.

use std::fs;

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::observability::{
    CreateScrapeConfigPayload, ScrapeConfig, ScrapeConfigList, ScrapeConfigResponse, UpdateScrapeConfigPayload,
};
use stackit_sdk::Request;

use super::{INSTANCE_FLAG, instance_flag, instance_label};
use crate::builder::CommandNode;
use crate::commands::{created, deleted};
use crate::error::{CliError, RemoteExt, Result};
use crate::flags::{ArgSpec, FlagError, FlagKind, FlagSpec, FlagValues};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation, gone_on_not_found, poll};
use crate::printer::Printer;
use crate::table::{Cell, Table};
use crate::waiter::{Terminal, WaitOptions, WaitTarget};

const JOB_NAME: &str = "JOB_NAME";
const PAYLOAD_FLAG: &str = "payload";
const JOB_NAME_FLAG: &str = "job-name";
const FILE_PATH_FLAG: &str = "file-path";

fn payload_flag(help: &'static str) -> FlagSpec {
    FlagSpec::new(PAYLOAD_FLAG, FlagKind::ReadFromFile, help)
}

/// The `scrape-config` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("scrape-config", "Provides functionality for scrape configurations in Observability")
        .child(
            CommandNode::leaf("create", "Creates a scrape configuration for an Observability instance", Create)
                .long_about(
                    "Creates a scrape configuration job for an Observability instance.\n\
                     The payload can be provided as a JSON string or a file path prefixed with \"@\".\n\
                     If no payload is provided, a default payload is used.",
                )
                .example(
                    "Create a scrape configuration with the default payload",
                    "stackit observability scrape-config create --instance-id xxx",
                )
                .example(
                    "Create a scrape configuration from a payload file",
                    "stackit observability scrape-config create --payload @./payload.json --instance-id xxx",
                )
                .flag(instance_flag())
                .flag(payload_flag(
                    "Request payload (JSON), or @path to a file containing it. Defaults to the payload of \"generate-payload\"",
                )),
        )
        .child(
            CommandNode::leaf("delete", "Deletes a scrape configuration", Delete)
                .example(
                    "Delete the scrape configuration \"my-config\"",
                    "stackit observability scrape-config delete my-config --instance-id xxx",
                )
                .arg(ArgSpec::identifier(JOB_NAME))
                .flag(instance_flag()),
        )
        .child(
            CommandNode::leaf("describe", "Shows details of a scrape configuration", Describe)
                .example(
                    "Describe the scrape configuration \"my-config\"",
                    "stackit observability scrape-config describe my-config --instance-id xxx",
                )
                .arg(ArgSpec::identifier(JOB_NAME))
                .flag(instance_flag()),
        )
        .child(
            CommandNode::leaf("list", "Lists all scrape configurations of an instance", List)
                .example(
                    "List all scrape configurations of an instance",
                    "stackit observability scrape-config list --instance-id xxx",
                )
                .flag(instance_flag()),
        )
        .child(
            CommandNode::leaf("update", "Updates a scrape configuration", Update)
                .long_about(
                    "Updates a scrape configuration of an Observability instance.\n\
                     The payload replaces the whole job. Use \"generate-payload --job-name\" to start from the current one.",
                )
                .example(
                    "Update the scrape configuration \"my-config\" from a payload file",
                    "stackit observability scrape-config update my-config --payload @./payload.json --instance-id xxx",
                )
                .arg(ArgSpec::identifier(JOB_NAME))
                .flag(instance_flag())
                .flag(payload_flag("Request payload (JSON), or @path to a file containing it").required()),
        )
        .child(
            CommandNode::leaf(
                "generate-payload",
                "Generates a payload to create or update scrape configurations",
                GeneratePayload,
            )
            .long_about(
                "Generates a JSON payload to be used as --payload input for scrape configuration creation or update.\n\
                 Without flags it prints a default creation payload.\n\
                 With --job-name and --instance-id it prints an update payload holding the job's current values.",
            )
            .example(
                "Write a creation payload with default values to a file",
                "stackit observability scrape-config generate-payload --file-path ./payload.json",
            )
            .example(
                "Preview an update payload for the existing job \"my-config\"",
                "stackit observability scrape-config generate-payload --job-name my-config --instance-id xxx",
            )
            .flag(FlagSpec::identifier(
                JOB_NAME_FLAG,
                "If set, generates an update payload with the current state of the given job",
            )
            .short('n'))
            .flag(FlagSpec::uuid(INSTANCE_FLAG, "ID of the Observability instance"))
            .flag(FlagSpec::string(FILE_PATH_FLAG, "If set, writes the payload to the given file").short('f'))
            .without_project(),
        )
}

fn parse_payload<T: serde::de::DeserializeOwned>(flags: &FlagValues) -> Result<Option<T>> {
    let Some(raw) = flags.read_from_file(PAYLOAD_FLAG)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| FlagError::InvalidJson(e.to_string()).for_flag(PAYLOAD_FLAG))
}

/// Scrape jobs are applied within a minute.
fn wait_options() -> WaitOptions {
    WaitOptions::default().with_deadline(std::time::Duration::from_secs(10 * 60))
}

/// Polls the job until `present` matches whether it exists.
async fn wait_job(ctx: &Context, input: &JobInput, present: bool, operation: &str, message: &str) -> Result<()> {
    let target = WaitTarget::new(format!("scrape configuration {}", input.job_name), operation, message);
    let client = &ctx.clients.observability;
    poll(
        ctx,
        &target,
        || {
            let request = client.get_scrape_config(input.globals.project(), &input.instance_id, &input.job_name);
            async move { gone_on_not_found(request.execute().await) }
        },
        |job: &Option<ScrapeConfigResponse>| match (job.is_some(), present) {
            (true, true) | (false, false) => Terminal::Success,
            (false, true) => Terminal::pending("creating"),
            (true, false) => Terminal::pending("deleting"),
        },
        &wait_options(),
    )
    .await?;
    Ok(())
}

/// Scrape job addressed by instance and job name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_id: String,
    job_name: String,
}

impl JobInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            instance_id: inv.flags.required_uuid(INSTANCE_FLAG)?,
            job_name: inv.arg(0)?.to_owned(),
        })
    }
}

/// Input of `scrape-config create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_id: String,
    payload: CreateScrapeConfigPayload,
}

/// `scrape-config create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    type Input = CreateInput;
    type Labels = String;
    type Request = Request<CreateScrapeConfigPayload, ScrapeConfigList>;
    type Response = ScrapeConfigList;

    fn parse(&self, inv: &Invocation) -> Result<CreateInput> {
        Ok(CreateInput {
            globals: inv.globals.clone(),
            instance_id: inv.flags.required_uuid(INSTANCE_FLAG)?,
            payload: parse_payload(&inv.flags)?.unwrap_or_else(CreateScrapeConfigPayload::default_job),
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &CreateInput) -> String {
        instance_label(ctx, &input.globals, &input.instance_id).await
    }

    fn confirmation(&self, input: &CreateInput, instance: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to create scrape configuration \"{}\" on Observability instance \"{instance}\"?",
            input.payload.job_name
        ))
    }

    fn build_request(&self, ctx: &Context, input: &CreateInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .create_scrape_config(input.globals.project(), &input.instance_id)
            .payload(input.payload.clone()))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &CreateInput, request: Self::Request) -> Result<ScrapeConfigList> {
        request.execute().await.remote("create scrape configuration")
    }

    fn waits(&self, _input: &CreateInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &CreateInput, _response: &ScrapeConfigList) -> Result<()> {
        let job = JobInput {
            globals: input.globals.clone(),
            instance_id: input.instance_id.clone(),
            job_name: input.payload.job_name.clone(),
        };
        wait_job(ctx, &job, true, "wait for scrape configuration creation", "Creating scrape config").await
    }

    fn render(&self, printer: &Printer, input: &CreateInput, instance: &String, response: &ScrapeConfigList) -> Result<()> {
        printer.result(response, |p| {
            p.outputln(&format!(
                "{} scrape configuration with name \"{}\" for Observability instance \"{instance}\"",
                created(input.globals.async_mode),
                input.payload.job_name
            ))
        })
    }
}

/// `scrape-config delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    type Input = JobInput;
    type Labels = String;
    type Request = Request<(), ScrapeConfigList>;
    type Response = ScrapeConfigList;

    fn parse(&self, inv: &Invocation) -> Result<JobInput> {
        JobInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &JobInput) -> String {
        instance_label(ctx, &input.globals, &input.instance_id).await
    }

    fn confirmation(&self, input: &JobInput, instance: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to delete scrape configuration \"{}\" on Observability instance \"{instance}\"? (This cannot be undone)",
            input.job_name
        ))
    }

    fn build_request(&self, ctx: &Context, input: &JobInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .delete_scrape_config(input.globals.project(), &input.instance_id, &input.job_name))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &JobInput, request: Self::Request) -> Result<ScrapeConfigList> {
        request.execute().await.remote("delete scrape configuration")
    }

    fn waits(&self, _input: &JobInput) -> bool {
        true
    }

    async fn wait(&self, ctx: &Context, input: &JobInput, _response: &ScrapeConfigList) -> Result<()> {
        wait_job(ctx, input, false, "wait for scrape configuration deletion", "Deleting scrape config").await
    }

    fn render(&self, printer: &Printer, input: &JobInput, instance: &String, _response: &ScrapeConfigList) -> Result<()> {
        printer.info(format_args!(
            "{} scrape configuration with name \"{}\" for Observability instance \"{instance}\"",
            deleted(input.globals.async_mode),
            input.job_name
        ));
        Ok(())
    }
}

/// `scrape-config describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = JobInput;
    type Labels = ();
    type Request = Request<(), ScrapeConfigResponse>;
    type Response = ScrapeConfig;

    fn parse(&self, inv: &Invocation) -> Result<JobInput> {
        JobInput::parse(inv)
    }

    fn build_request(&self, ctx: &Context, input: &JobInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .get_scrape_config(input.globals.project(), &input.instance_id, &input.job_name))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &JobInput, request: Self::Request) -> Result<ScrapeConfig> {
        Ok(request.execute().await.remote("read scrape configuration")?.data)
    }

    fn render(&self, printer: &Printer, _input: &JobInput, _labels: &(), config: &ScrapeConfig) -> Result<()> {
        printer.result(config, |p| p.output(&describe_table(config).render()))
    }
}

fn describe_table(config: &ScrapeConfig) -> Table {
    let saml2_disabled = config
        .params
        .as_ref()
        .and_then(|params| params.get("saml2"))
        .and_then(|values| values.first())
        .is_some_and(|value| value == "disabled");

    let mut table = Table::key_value();
    table
        .add_pair("NAME", &config.job_name)
        .add_separator()
        .add_pair("METRICS PATH", &config.metrics_path)
        .add_separator()
        .add_pair("SCHEME", &config.scheme)
        .add_separator()
        .add_pair("SCRAPE INTERVAL", &config.scrape_interval)
        .add_separator()
        .add_pair("SCRAPE TIMEOUT", &config.scrape_timeout)
        .add_separator()
        .add_pair("SAML2", if saml2_disabled { "Disabled" } else { "Enabled" })
        .add_separator();
    match &config.basic_auth {
        None => {
            table.add_pair("AUTHENTICATION", "None");
        }
        Some(auth) => {
            table
                .add_pair("AUTHENTICATION", "Basic Auth")
                .add_separator()
                .add_pair("USERNAME", auth.username.as_deref())
                .add_separator()
                .add_pair("PASSWORD", auth.password.as_deref());
        }
    }
    table.add_separator();
    for (i, target) in config.static_configs.iter().enumerate() {
        let labels = match &target.labels {
            Some(labels) => labels
                .iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect::<Vec<_>>()
                .join(","),
            None => "N/A".to_owned(),
        };
        let urls = if target.targets.is_empty() {
            "N/A".to_owned()
        } else {
            target.targets.join(",")
        };
        table
            .add_pair(&format!("TARGET #{}", i + 1), format!("labels: {labels}\nurls: {urls}"))
            .add_separator();
    }
    table
}

/// Input of `scrape-config list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_id: String,
}

/// `scrape-config list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct List;

#[async_trait]
impl Operation for List {
    type Input = ListInput;
    type Labels = ();
    type Request = Request<(), ScrapeConfigList>;
    type Response = Vec<ScrapeConfig>;

    fn parse(&self, inv: &Invocation) -> Result<ListInput> {
        Ok(ListInput {
            globals: inv.globals.clone(),
            instance_id: inv.flags.required_uuid(INSTANCE_FLAG)?,
        })
    }

    fn build_request(&self, ctx: &Context, input: &ListInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .list_scrape_configs(input.globals.project(), &input.instance_id))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &ListInput, request: Self::Request) -> Result<Vec<ScrapeConfig>> {
        Ok(request.execute().await.remote("get scrape configurations")?.data)
    }

    fn render(&self, printer: &Printer, input: &ListInput, _labels: &(), configs: &Vec<ScrapeConfig>) -> Result<()> {
        printer.result(configs, |p| {
            if configs.is_empty() {
                p.info(format_args!(
                    "No scrape configurations found for instance \"{}\"",
                    input.instance_id
                ));
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(["NAME", "TARGETS", "SCRAPE INTERVAL"]);
            for config in configs {
                let targets: Vec<&str> = config
                    .static_configs
                    .iter()
                    .flat_map(|c| c.targets.iter().map(String::as_str))
                    .collect();
                table.add_row([
                    Cell::from(&config.job_name),
                    Cell::from(targets.join(",")),
                    Cell::from(&config.scrape_interval),
                ]);
            }
            p.output(&table.render())
        })
    }
}

/// Input of `scrape-config update`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInput {
    #[serde(flatten)]
    job: JobInput,
    payload: UpdateScrapeConfigPayload,
}

/// `scrape-config update`. Replaces the whole job.
#[derive(Debug, Clone, Copy, Default)]
pub struct Update;

#[async_trait]
impl Operation for Update {
    type Input = UpdateInput;
    type Labels = String;
    type Request = Request<UpdateScrapeConfigPayload, ScrapeConfigList>;
    type Response = ScrapeConfigList;

    fn parse(&self, inv: &Invocation) -> Result<UpdateInput> {
        let payload = parse_payload(&inv.flags)?
            .ok_or_else(|| CliError::flag_validation(PAYLOAD_FLAG, "no payload specified"))?;
        Ok(UpdateInput {
            job: JobInput::parse(inv)?,
            payload,
        })
    }

    async fn resolve_labels(&self, ctx: &Context, input: &UpdateInput) -> String {
        instance_label(ctx, &input.job.globals, &input.job.instance_id).await
    }

    fn confirmation(&self, input: &UpdateInput, instance: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to update scrape configuration \"{}\" on Observability instance \"{instance}\"?",
            input.job.job_name
        ))
    }

    fn build_request(&self, ctx: &Context, input: &UpdateInput) -> Result<Self::Request> {
        let job = &input.job;
        Ok(ctx
            .clients
            .observability
            .update_scrape_config(job.globals.project(), &job.instance_id, &job.job_name)
            .payload(input.payload.clone()))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &UpdateInput, request: Self::Request) -> Result<ScrapeConfigList> {
        request.execute().await.remote("update scrape configuration")
    }

    fn render(&self, printer: &Printer, input: &UpdateInput, instance: &String, response: &ScrapeConfigList) -> Result<()> {
        printer.result(response, |p| {
            p.outputln(&format!(
                "Updated scrape configuration with name \"{}\" for Observability instance \"{instance}\"",
                input.job.job_name
            ))
        })
    }
}

/// Input of `scrape-config generate-payload`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    /// Job and instance to read, when generating an update payload.
    existing: Option<(String, String)>,
    file_path: Option<String>,
}

/// A payload ready for `--payload`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeneratedPayload {
    /// Default values for a new job.
    Create(CreateScrapeConfigPayload),
    /// Current values of an existing job.
    Update(UpdateScrapeConfigPayload),
}

/// `scrape-config generate-payload`. Needs no project unless reading a job.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratePayload;

#[async_trait]
impl Operation for GeneratePayload {
    type Input = GenerateInput;
    type Labels = ();
    type Request = Option<Request<(), ScrapeConfigResponse>>;
    type Response = GeneratedPayload;

    fn parse(&self, inv: &Invocation) -> Result<GenerateInput> {
        let existing = match inv.flags.identifier(JOB_NAME_FLAG)? {
            None => None,
            Some(job_name) => {
                let instance_id = inv.flags.uuid(INSTANCE_FLAG)?;
                match (inv.globals.project_id.as_deref(), instance_id) {
                    (Some(_), Some(instance_id)) => Some((job_name, instance_id)),
                    _ => {
                        return Err(CliError::FlagConstraint {
                            flags: vec![JOB_NAME_FLAG.to_owned(), INSTANCE_FLAG.to_owned(), "project-id".to_owned()],
                            message: "if a job-name is provided then instance-id and project-id must be provided"
                                .to_owned(),
                        });
                    }
                }
            }
        };
        Ok(GenerateInput {
            globals: inv.globals.clone(),
            existing,
            file_path: inv.flags.string(FILE_PATH_FLAG)?,
        })
    }

    fn build_request(&self, ctx: &Context, input: &GenerateInput) -> Result<Self::Request> {
        Ok(input.existing.as_ref().map(|(job_name, instance_id)| {
            ctx.clients
                .observability
                .get_scrape_config(input.globals.project(), instance_id, job_name)
        }))
    }

    async fn dispatch(&self, _ctx: &Context, _input: &GenerateInput, request: Self::Request) -> Result<GeneratedPayload> {
        let Some(request) = request else {
            return Ok(GeneratedPayload::Create(CreateScrapeConfigPayload::default_job()));
        };
        let current = request.execute().await.remote("read Observability scrape config")?;
        Ok(GeneratedPayload::Update(current.data.into()))
    }

    fn render(&self, printer: &Printer, input: &GenerateInput, _labels: &(), payload: &GeneratedPayload) -> Result<()> {
        let json = serde_json::to_string_pretty(payload).map_err(|e| CliError::internal("marshal payload", e))?;
        if let Some(path) = &input.file_path {
            fs::write(path, json)
                .map_err(|e| CliError::flag_validation(FILE_PATH_FLAG, format!("write payload to the file: {e}")))?;
            return Ok(());
        }
        printer.result(payload, |p| p.outputln(&json))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stackit_sdk::Method;

    use super::*;
    use crate::commands::testing::{PROJECT, Reply, Stub, run};

    const INSTANCE: &str = "55555555-5555-5555-5555-555555555555";

    fn jobs_path() -> String {
        format!("/v1/projects/{PROJECT}/instances/{INSTANCE}/scrapeconfigs")
    }

    const DEFAULT_PAYLOAD: &str = r#"{
  "jobName": "default-name",
  "metricsPath": "/metrics",
  "scheme": "https",
  "scrapeInterval": "5m",
  "scrapeTimeout": "2m",
  "staticConfigs": [
    {
      "targets": [
        "url-target"
      ]
    }
  ]
}
"#;

    #[tokio::test]
    async fn generate_payload_needs_no_project_or_network() {
        let stub = Stub::new();
        let outcome = run(&stub, &["observability", "scrape-config", "generate-payload"], "").await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(outcome.out, DEFAULT_PAYLOAD);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn generate_payload_json_format_is_identical() {
        let stub = Stub::new();
        let outcome = run(
            &stub,
            &["observability", "scrape-config", "generate-payload", "--output-format", "json"],
            "",
        )
        .await;
        assert_eq!(outcome.out, DEFAULT_PAYLOAD);
    }

    #[tokio::test]
    async fn generate_payload_writes_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("payload.json");
        let path_arg = path.display().to_string();
        let stub = Stub::new();
        let outcome = run(&stub, &["observability", "scrape-config", "generate-payload", "-f", &path_arg], "").await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(outcome.out, "");
        let written = fs::read_to_string(&path).expect("payload file");
        assert_eq!(format!("{written}\n"), DEFAULT_PAYLOAD);
    }

    #[tokio::test]
    async fn job_name_requires_instance_and_project() {
        let stub = Stub::new();
        let outcome = run(&stub, &["observability", "scrape-config", "generate-payload", "--job-name", "job"], "").await;
        assert_ne!(outcome.code, 0);
        assert!(
            outcome.err.contains("if a job-name is provided then instance-id and project-id must be provided"),
            "{}",
            outcome.err
        );
    }

    #[tokio::test]
    async fn update_payload_drops_the_job_name() {
        let stub = Stub::new().json(
            Method::Get,
            &format!("{}/job", jobs_path()),
            json!({"data": {
                "jobName": "job",
                "metricsPath": "/m",
                "scheme": "http",
                "scrapeInterval": "1m",
                "scrapeTimeout": "30s",
                "staticConfigs": [{"targets": ["host:9100"], "labels": {"env": "prod"}}],
                "basicAuth": {"username": "u"}
            }}),
        );
        let outcome = run(
            &stub,
            &[
                "observability", "scrape-config", "generate-payload", "-n", "job", "--instance-id", INSTANCE,
                "--project-id", PROJECT,
            ],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        let value: serde_json::Value = serde_json::from_str(&outcome.out).expect("json");
        assert_eq!(
            value,
            json!({
                "metricsPath": "/m",
                "scheme": "http",
                "scrapeInterval": "1m",
                "scrapeTimeout": "30s",
                "staticConfigs": [{"targets": ["host:9100"], "labels": {"env": "prod"}}],
                "basicAuth": {"username": "u"}
            })
        );
    }

    #[tokio::test]
    async fn create_without_payload_sends_the_default_job() {
        let stub = Stub::new()
            .json(Method::Post, &jobs_path(), json!({"data": []}))
            .json(Method::Get, &format!("{}/default-name", jobs_path()), json!({"data": {"jobName": "default-name"}}));
        let outcome = run(
            &stub,
            &["observability", "scrape-config", "create", "--instance-id", INSTANCE, "--project-id", PROJECT, "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        let sent: serde_json::Value = serde_json::from_str(DEFAULT_PAYLOAD).expect("json");
        assert_eq!(stub.body(Method::Post, &jobs_path()), Some(sent));
        assert_eq!(
            outcome.out,
            format!("Created scrape configuration with name \"default-name\" for Observability instance \"{INSTANCE}\"\n")
        );
    }

    #[tokio::test]
    async fn delete_waits_for_the_job_to_disappear() {
        let job_path = format!("{}/job", jobs_path());
        let stub = Stub::new()
            .json(Method::Delete, &job_path, json!({"data": []}))
            .on(Method::Get, &job_path, Reply::Status(404));
        let outcome = run(
            &stub,
            &["observability", "scrape-config", "delete", "job", "--instance-id", INSTANCE, "--project-id", PROJECT, "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(stub.count(Method::Get, &job_path), 1);
    }

    #[test]
    fn describe_lists_targets_and_auth() {
        let config = ScrapeConfig {
            job_name: "job".into(),
            params: Some([("saml2".to_owned(), vec!["disabled".to_owned()])].into()),
            static_configs: vec![stackit_sdk::observability::StaticConfig {
                targets: vec!["a:1".into(), "b:2".into()],
                labels: None,
            }],
            ..ScrapeConfig::default()
        };
        let rendered = describe_table(&config).render();
        assert!(rendered.contains("SAML2           │ Disabled\n"), "{rendered}");
        assert!(rendered.contains("AUTHENTICATION  │ None\n"), "{rendered}");
        assert!(rendered.contains("TARGET #1       │ labels: N/A\n"), "{rendered}");
        assert!(rendered.contains("                │ urls: a:1,b:2\n"), "{rendered}");
    }
}
