//! `observability grafana`: Grafana settings of an instance.

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::observability::{GrafanaConfigs, Instance};
use stackit_sdk::{NoContent, Request};

use super::instance_label;
use crate::builder::CommandNode;
use crate::error::{RemoteExt, Result};
use crate::flags::{ArgSpec, FlagSpec};
use crate::globals::GlobalFlags;
use crate::pipeline::{Context, Invocation, Operation};
use crate::printer::Printer;
use crate::table::Table;

const INSTANCE_ID: &str = "INSTANCE_ID";
const SHOW_PASSWORD_FLAG: &str = "show-password";

/// The `grafana` branch.
#[must_use]
pub fn command() -> CommandNode {
    CommandNode::branch("grafana", "Provides functionality for the Grafana of Observability instances")
        .child(
            CommandNode::leaf(
                "describe",
                "Shows details of the Grafana configuration of an Observability instance",
                Describe,
            )
            .long_about(
                "Shows details of the Grafana configuration of an Observability instance.\n\
                 The Grafana dashboard URL and initial admin credentials are shown in the pretty output format. \
                 The initial credentials are only valid until the first login.\n\
                 The initial password is hidden unless \"--show-password\" is set.",
            )
            .example("Describe the Grafana of an instance", "stackit observability grafana describe xxx")
            .example(
                "Describe the Grafana of an instance and show the initial admin password",
                "stackit observability grafana describe xxx --show-password",
            )
            .arg(ArgSpec::uuid(INSTANCE_ID))
            .flag(FlagSpec::bool(SHOW_PASSWORD_FLAG, "Show password in output").short('s')),
        )
        .child(setting_branch(Setting::SingleSignOn))
        .child(setting_branch(Setting::PublicReadAccess))
}

fn setting_branch(setting: Setting) -> CommandNode {
    let (enable_about, disable_about, enable_example, disable_example) = match setting {
        Setting::SingleSignOn => (
            "Enables single sign-on for Grafana on an Observability instance",
            "Disables single sign-on for Grafana on an Observability instance",
            "stackit observability grafana single-sign-on enable xxx",
            "stackit observability grafana single-sign-on disable xxx",
        ),
        Setting::PublicReadAccess => (
            "Enables public read access for Grafana on an Observability instance",
            "Disables public read access for Grafana on an Observability instance",
            "stackit observability grafana public-read-access enable xxx",
            "stackit observability grafana public-read-access disable xxx",
        ),
    };
    CommandNode::branch(setting.command(), setting.about())
        .child(
            CommandNode::leaf("enable", enable_about, Toggle { setting, enable: true })
                .example(enable_about, enable_example)
                .arg(ArgSpec::uuid(INSTANCE_ID)),
        )
        .child(
            CommandNode::leaf("disable", disable_about, Toggle { setting, enable: false })
                .example(disable_about, disable_example)
                .arg(ArgSpec::uuid(INSTANCE_ID)),
        )
}

/// Input of the commands addressing one instance's Grafana.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_id: String,
}

impl GrafanaInput {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            instance_id: inv.arg(0)?.to_owned(),
        })
    }
}

/// Input of `grafana describe`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeInput {
    #[serde(flatten)]
    grafana: GrafanaInput,
    show_password: bool,
}

/// Grafana configs plus the instance details holding the dashboard URL and
/// initial credentials. Serializes as the configs alone.
#[derive(Debug, Clone, Serialize)]
pub struct GrafanaDescription {
    #[serde(flatten)]
    configs: GrafanaConfigs,
    #[serde(skip)]
    instance: Instance,
}

/// `grafana describe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Describe;

#[async_trait]
impl Operation for Describe {
    type Input = DescribeInput;
    type Labels = ();
    type Request = Request<(), GrafanaConfigs>;
    type Response = GrafanaDescription;

    fn parse(&self, inv: &Invocation) -> Result<DescribeInput> {
        Ok(DescribeInput {
            grafana: GrafanaInput::parse(inv)?,
            show_password: inv.flags.bool(SHOW_PASSWORD_FLAG)?,
        })
    }

    fn build_request(&self, ctx: &Context, input: &DescribeInput) -> Result<Self::Request> {
        let grafana = &input.grafana;
        Ok(ctx
            .clients
            .observability
            .get_grafana_configs(grafana.globals.project(), &grafana.instance_id))
    }

    async fn dispatch(&self, ctx: &Context, input: &DescribeInput, request: Self::Request) -> Result<GrafanaDescription> {
        let configs = request.execute().await.remote("get Grafana configs")?;
        let instance = ctx
            .clients
            .observability
            .get_instance(input.grafana.globals.project(), &input.grafana.instance_id)
            .execute()
            .await
            .remote("get instance")?;
        Ok(GrafanaDescription { configs, instance })
    }

    fn render(&self, printer: &Printer, input: &DescribeInput, _labels: &(), response: &GrafanaDescription) -> Result<()> {
        printer.result(response, |p| {
            let details = response.instance.instance.clone().unwrap_or_default();
            let password = if input.show_password {
                details.grafana_admin_password
            } else {
                Some("<hidden>".to_owned())
            };
            let mut table = Table::key_value();
            table
                .add_pair("GRAFANA DASHBOARD", details.grafana_url)
                .add_separator()
                .add_pair("PUBLIC READ ACCESS", response.configs.public_read_access)
                .add_separator()
                .add_pair("SINGLE SIGN-ON", response.configs.use_stackit_sso)
                .add_separator()
                .add_pair("INITIAL ADMIN USER (DEFAULT)", details.grafana_admin_user)
                .add_separator()
                .add_pair("INITIAL ADMIN PASSWORD (DEFAULT)", password);
            p.output(&table.render())
        })
    }
}

/// A boolean Grafana setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Log in with STACKIT accounts.
    SingleSignOn,
    /// Dashboards readable without login.
    PublicReadAccess,
}

impl Setting {
    const fn command(self) -> &'static str {
        match self {
            Self::SingleSignOn => "single-sign-on",
            Self::PublicReadAccess => "public-read-access",
        }
    }

    const fn about(self) -> &'static str {
        match self {
            Self::SingleSignOn => "Enable or disable single sign-on for Grafana",
            Self::PublicReadAccess => "Enable or disable public read access for Grafana",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::SingleSignOn => "single sign-on",
            Self::PublicReadAccess => "public read access",
        }
    }

    fn apply(self, configs: &mut GrafanaConfigs, enable: bool) {
        match self {
            Self::SingleSignOn => configs.use_stackit_sso = Some(enable),
            Self::PublicReadAccess => configs.public_read_access = Some(enable),
        }
    }
}

/// `grafana <setting> enable|disable`: read the configs, flip one field,
/// write them back.
#[derive(Debug, Clone, Copy)]
pub struct Toggle {
    setting: Setting,
    enable: bool,
}

impl Toggle {
    const fn verb(self) -> &'static str {
        if self.enable { "enable" } else { "disable" }
    }
}

#[async_trait]
impl Operation for Toggle {
    type Input = GrafanaInput;
    type Labels = String;
    type Request = Request<GrafanaConfigs, NoContent>;
    type Response = GrafanaConfigs;

    fn parse(&self, inv: &Invocation) -> Result<GrafanaInput> {
        GrafanaInput::parse(inv)
    }

    async fn resolve_labels(&self, ctx: &Context, input: &GrafanaInput) -> String {
        instance_label(ctx, &input.globals, &input.instance_id).await
    }

    fn confirmation(&self, _input: &GrafanaInput, instance: &String) -> Option<String> {
        Some(format!(
            "Are you sure you want to {} {} for Grafana on instance \"{instance}\"?",
            self.verb(),
            self.setting.description()
        ))
    }

    fn build_request(&self, ctx: &Context, input: &GrafanaInput) -> Result<Self::Request> {
        Ok(ctx
            .clients
            .observability
            .update_grafana_configs(input.globals.project(), &input.instance_id))
    }

    /// Returns the configs as written.
    async fn dispatch(&self, ctx: &Context, input: &GrafanaInput, request: Self::Request) -> Result<GrafanaConfigs> {
        let mut configs = ctx
            .clients
            .observability
            .get_grafana_configs(input.globals.project(), &input.instance_id)
            .execute()
            .await
            .remote("get current Grafana configs")?;
        self.setting.apply(&mut configs, self.enable);
        request
            .payload(configs.clone())
            .execute()
            .await
            .remote(&format!("{} {} for Grafana", self.verb(), self.setting.description()))?;
        Ok(configs)
    }

    fn render(&self, printer: &Printer, _input: &GrafanaInput, instance: &String, configs: &GrafanaConfigs) -> Result<()> {
        let state = if self.enable { "Enabled" } else { "Disabled" };
        printer.result(configs, |p| {
            p.outputln(&format!(
                "{state} {} for Grafana on instance \"{instance}\".",
                self.setting.description()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stackit_sdk::Method;
    use test_case::test_case;

    use crate::commands::testing::{PROJECT, Stub, run};

    const INSTANCE: &str = "55555555-5555-5555-5555-555555555555";

    fn instance_path() -> String {
        format!("/v1/projects/{PROJECT}/instances/{INSTANCE}")
    }

    fn configs_path() -> String {
        format!("{}/grafana-configs", instance_path())
    }

    #[test_case("single-sign-on", "enable", json!({"publicReadAccess": false, "useStackitSso": true}), "Enabled single sign-on"; "sso on")]
    #[test_case("single-sign-on", "disable", json!({"publicReadAccess": false, "useStackitSso": false}), "Disabled single sign-on"; "sso off")]
    #[test_case("public-read-access", "enable", json!({"publicReadAccess": true, "useStackitSso": true}), "Enabled public read access"; "public on")]
    #[test_case("public-read-access", "disable", json!({"publicReadAccess": false, "useStackitSso": true}), "Disabled public read access"; "public off")]
    #[tokio::test]
    async fn toggles_override_one_field(setting: &str, verb: &str, expected: serde_json::Value, message: &str) {
        let stub = Stub::new()
            .json(Method::Get, &instance_path(), json!({"name": "obs"}))
            .json(Method::Get, &configs_path(), json!({"publicReadAccess": false, "useStackitSso": true}))
            .json(Method::Put, &configs_path(), json!({}));
        let outcome = run(
            &stub,
            &["observability", "grafana", setting, verb, INSTANCE, "--project-id", PROJECT, "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(stub.body(Method::Put, &configs_path()), Some(expected));
        assert_eq!(outcome.out, format!("{message} for Grafana on instance \"obs\".\n"));
    }

    #[tokio::test]
    async fn toggle_keeps_oauth_settings() {
        let oauth = json!({
            "apiUrl": "https://idp/api",
            "authUrl": "https://idp/auth",
            "enabled": true,
            "oauthClientId": "client",
            "oauthClientSecret": "secret",
            "roleAttributePath": "role",
            "tokenUrl": "https://idp/token"
        });
        let stub = Stub::new()
            .json(Method::Get, &configs_path(), json!({"genericOauth": oauth, "useStackitSso": false}))
            .json(Method::Put, &configs_path(), json!({}));
        let outcome = run(
            &stub,
            &["observability", "grafana", "single-sign-on", "enable", INSTANCE, "--project-id", PROJECT, "-y"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        let body = stub.body(Method::Put, &configs_path()).unwrap_or_default();
        assert_eq!(body["genericOauth"], oauth);
        assert_eq!(body["useStackitSso"], json!(true));
    }

    #[tokio::test]
    async fn describe_hides_the_password() {
        let stub = Stub::new()
            .json(Method::Get, &configs_path(), json!({"publicReadAccess": true, "useStackitSso": false}))
            .json(
                Method::Get,
                &instance_path(),
                json!({"instance": {
                    "grafanaUrl": "https://grafana",
                    "grafanaAdminUser": "admin",
                    "grafanaAdminPassword": "s3cret"
                }}),
            );
        let args = ["observability", "grafana", "describe", INSTANCE, "--project-id", PROJECT];
        let outcome = run(&stub, &args, "").await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert!(outcome.out.contains("INITIAL ADMIN PASSWORD (DEFAULT) │ <hidden>\n"), "{}", outcome.out);
        assert!(outcome.out.contains("GRAFANA DASHBOARD                │ https://grafana\n"), "{}", outcome.out);

        let mut shown = args.to_vec();
        shown.push("-s");
        let outcome = run(&stub, &shown, "").await;
        assert!(outcome.out.contains("│ s3cret\n"), "{}", outcome.out);
    }

    #[tokio::test]
    async fn describe_json_is_the_configs_only() {
        let stub = Stub::new()
            .json(Method::Get, &configs_path(), json!({"publicReadAccess": true}))
            .json(Method::Get, &instance_path(), json!({"instance": {"grafanaAdminPassword": "s3cret"}}));
        let outcome = run(
            &stub,
            &["observability", "grafana", "describe", INSTANCE, "--project-id", PROJECT, "--output-format", "json"],
            "",
        )
        .await;
        assert_eq!(outcome.code, 0, "{}", outcome.err);
        assert_eq!(outcome.out, "{\n  \"publicReadAccess\": true\n}\n");
    }
}
