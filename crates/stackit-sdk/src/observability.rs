//! Observability: instances, plans, Grafana settings, scrape configs and credentials.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::{NoContent, Request, segment};
use crate::transport::{Method, Transport};

/// Default Observability endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://argus.api.stackit.cloud";

/// An observability plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Plan {
    /// Internal plan ID.
    pub id: String,
    /// Plan ID used when creating instances.
    pub plan_id: String,
    /// Human readable name, e.g. `Observability-Monitoring-Basic-EU01`.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Maximum number of scrape targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_metric_samples: Option<i64>,
    /// Number of alert rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_rules: Option<i64>,
    /// Log storage in GB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_storage: Option<i64>,
}

/// Response of the plan listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlansResponse {
    /// Available plans.
    pub plans: Vec<Plan>,
}

/// URLs and initial credentials of a provisioned instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceDetails {
    /// Grafana dashboard URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grafana_url: Option<String>,
    /// Initial Grafana admin user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grafana_admin_user: Option<String>,
    /// Initial Grafana admin password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grafana_admin_password: Option<String>,
    /// Metrics query URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_url: Option<String>,
    /// Remote write URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_metrics_url: Option<String>,
    /// Logs URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_url: Option<String>,
    /// Alerting URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerting_url: Option<String>,
}

/// Full view of an instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Instance {
    /// Instance ID.
    pub id: String,
    /// Name.
    pub name: String,
    /// Plan ID.
    pub plan_id: String,
    /// Plan name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    /// Status, e.g. `CREATE_SUCCEEDED`.
    pub status: String,
    /// Error message of a failed operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Provisioning details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceDetails>,
}

/// Summary entry of the instance listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceSummary {
    /// Instance ID.
    pub id: String,
    /// Name.
    pub name: String,
    /// Plan name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    /// Status.
    pub status: String,
}

/// Response of the instance listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceList {
    /// Instances of the project.
    pub instances: Vec<InstanceSummary>,
}

/// Body of an instance creation or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePayload {
    /// Name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Plan ID.
    pub plan_id: String,
}

/// Response of instance mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceMutation {
    /// Affected instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Server message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Generic OAuth settings of Grafana.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrafanaOauth {
    /// Endpoint of the identity provider.
    pub api_url: String,
    /// Authorization endpoint.
    pub auth_url: String,
    /// Whether OAuth login is enabled.
    pub enabled: bool,
    /// Display name of the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Client ID.
    pub oauth_client_id: String,
    /// Client secret.
    pub oauth_client_secret: String,
    /// JMESPath mapping claims to Grafana roles.
    pub role_attribute_path: String,
    /// Fail login when no role matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_attribute_strict: Option<bool>,
    /// Requested scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,
    /// Token endpoint.
    pub token_url: String,
    /// Use PKCE.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_pkce: Option<bool>,
}

/// Grafana settings of an instance. Also used as the update body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrafanaConfigs {
    /// Generic OAuth login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_oauth: Option<GrafanaOauth>,
    /// Anonymous read access to dashboards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_read_access: Option<bool>,
    /// Login with STACKIT single sign-on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_stackit_sso: Option<bool>,
}

/// Targets scraped by a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticConfig {
    /// `host:port` or URL targets.
    pub targets: Vec<String>,
    /// Labels attached to every sample.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Basic auth credentials of a scrape job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BasicAuth {
    /// User name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// TLS settings of a scrape job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TlsConfig {
    /// Skip certificate verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure_skip_verify: Option<bool>,
}

/// A scrape job as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeConfig {
    /// Job name, unique per instance.
    pub job_name: String,
    /// HTTP path of the metrics endpoint.
    pub metrics_path: String,
    /// `http` or `https`.
    pub scheme: String,
    /// Scrape interval, e.g. `5m`.
    pub scrape_interval: String,
    /// Scrape timeout, e.g. `2m`.
    pub scrape_timeout: String,
    /// Targets.
    pub static_configs: Vec<StaticConfig>,
    /// Sample limit per scrape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_limit: Option<f64>,
    /// Keep labels from the target on conflict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub honor_labels: Option<bool>,
    /// Keep timestamps from the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub honor_time_stamps: Option<bool>,
    /// Basic auth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    /// TLS settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
    /// Extra URL parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, Vec<String>>>,
    /// Relabeling applied to scraped samples, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_relabel_configs: Option<Vec<Value>>,
}

/// Body of a scrape config creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScrapeConfigPayload {
    /// Job name.
    pub job_name: String,
    /// HTTP path of the metrics endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<String>,
    /// `http` or `https`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Scrape interval.
    pub scrape_interval: String,
    /// Scrape timeout.
    pub scrape_timeout: String,
    /// Targets.
    pub static_configs: Vec<StaticConfig>,
    /// Sample limit per scrape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_limit: Option<f64>,
    /// Keep labels from the target on conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honor_labels: Option<bool>,
    /// Keep timestamps from the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honor_time_stamps: Option<bool>,
    /// Basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    /// TLS settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
    /// Extra URL parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, Vec<String>>>,
    /// Relabeling applied to scraped samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_relabel_configs: Option<Vec<Value>>,
}

impl CreateScrapeConfigPayload {
    /// The payload used when the caller provides none.
    #[must_use]
    pub fn default_job() -> Self {
        Self {
            job_name: "default-name".to_owned(),
            metrics_path: Some("/metrics".to_owned()),
            scheme: Some("https".to_owned()),
            scrape_interval: "5m".to_owned(),
            scrape_timeout: "2m".to_owned(),
            static_configs: vec![StaticConfig {
                targets: vec!["url-target".to_owned()],
                labels: None,
            }],
            ..Self::default()
        }
    }
}

/// Body of a scrape config update: the full job without its name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScrapeConfigPayload {
    /// HTTP path of the metrics endpoint.
    pub metrics_path: String,
    /// `http` or `https`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Scrape interval.
    pub scrape_interval: String,
    /// Scrape timeout.
    pub scrape_timeout: String,
    /// Targets.
    pub static_configs: Vec<StaticConfig>,
    /// Sample limit per scrape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_limit: Option<f64>,
    /// Keep labels from the target on conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honor_labels: Option<bool>,
    /// Keep timestamps from the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honor_time_stamps: Option<bool>,
    /// Basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    /// TLS settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
    /// Extra URL parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, Vec<String>>>,
    /// Relabeling applied to scraped samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_relabel_configs: Option<Vec<Value>>,
}

impl From<ScrapeConfig> for UpdateScrapeConfigPayload {
    fn from(config: ScrapeConfig) -> Self {
        Self {
            metrics_path: config.metrics_path,
            scheme: Some(config.scheme).filter(|s| !s.is_empty()),
            scrape_interval: config.scrape_interval,
            scrape_timeout: config.scrape_timeout,
            static_configs: config.static_configs,
            sample_limit: config.sample_limit,
            honor_labels: config.honor_labels,
            honor_time_stamps: config.honor_time_stamps,
            basic_auth: config.basic_auth,
            tls_config: config.tls_config,
            params: config.params,
            metrics_relabel_configs: config.metrics_relabel_configs,
        }
    }
}

/// Envelope around a single scrape config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeConfigResponse {
    /// The scrape config.
    pub data: ScrapeConfig,
}

/// Response of the scrape config listing and of scrape config mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeConfigList {
    /// All scrape configs of the instance.
    pub data: Vec<ScrapeConfig>,
    /// Server message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Technical credentials of an instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Response of a credentials creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateCredentialsResponse {
    /// The new credentials.
    pub credentials: Credentials,
    /// Server message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Entry of the credentials listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialsSummary {
    /// User name.
    pub name: String,
    /// Key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Response of the credentials listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialsList {
    /// Credentials of the instance.
    pub credentials: Vec<CredentialsSummary>,
}

/// Client for the Observability API.
#[derive(Clone)]
pub struct ObservabilityClient {
    transport: Arc<dyn Transport>,
}

impl ObservabilityClient {
    /// Creates a client on top of a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn project(project_id: &str) -> String {
        format!("/v1/projects/{}", segment(project_id))
    }

    fn instance_path(project_id: &str, instance_id: &str) -> String {
        format!("{}/instances/{}", Self::project(project_id), segment(instance_id))
    }

    fn request<P, R>(&self, method: Method, path: String) -> Request<P, R>
    where
        P: Serialize + Send + Sync,
        R: serde::de::DeserializeOwned,
    {
        Request::new(&self.transport, method, path)
    }

    /// Lists available plans.
    #[must_use]
    pub fn list_plans(&self, project_id: &str) -> Request<(), PlansResponse> {
        self.request(Method::Get, format!("{}/plans", Self::project(project_id)))
    }

    /// Lists instances.
    #[must_use]
    pub fn list_instances(&self, project_id: &str) -> Request<(), InstanceList> {
        self.request(Method::Get, format!("{}/instances", Self::project(project_id)))
    }

    /// Gets an instance.
    #[must_use]
    pub fn get_instance(&self, project_id: &str, instance_id: &str) -> Request<(), Instance> {
        self.request(Method::Get, Self::instance_path(project_id, instance_id))
    }

    /// Creates an instance.
    #[must_use]
    pub fn create_instance(&self, project_id: &str) -> Request<InstancePayload, InstanceMutation> {
        self.request(Method::Post, format!("{}/instances", Self::project(project_id)))
    }

    /// Replaces the name and plan of an instance.
    #[must_use]
    pub fn update_instance(&self, project_id: &str, instance_id: &str) -> Request<InstancePayload, InstanceMutation> {
        self.request(Method::Put, Self::instance_path(project_id, instance_id))
    }

    /// Deletes an instance.
    #[must_use]
    pub fn delete_instance(&self, project_id: &str, instance_id: &str) -> Request<(), InstanceMutation> {
        self.request(Method::Delete, Self::instance_path(project_id, instance_id))
    }

    /// Gets the Grafana settings of an instance.
    #[must_use]
    pub fn get_grafana_configs(&self, project_id: &str, instance_id: &str) -> Request<(), GrafanaConfigs> {
        self.request(
            Method::Get,
            format!("{}/grafana-configs", Self::instance_path(project_id, instance_id)),
        )
    }

    /// Replaces the Grafana settings of an instance.
    #[must_use]
    pub fn update_grafana_configs(&self, project_id: &str, instance_id: &str) -> Request<GrafanaConfigs, NoContent> {
        self.request(
            Method::Put,
            format!("{}/grafana-configs", Self::instance_path(project_id, instance_id)),
        )
    }

    /// Lists the scrape configs of an instance.
    #[must_use]
    pub fn list_scrape_configs(&self, project_id: &str, instance_id: &str) -> Request<(), ScrapeConfigList> {
        self.request(
            Method::Get,
            format!("{}/scrapeconfigs", Self::instance_path(project_id, instance_id)),
        )
    }

    /// Gets a scrape config.
    #[must_use]
    pub fn get_scrape_config(&self, project_id: &str, instance_id: &str, job_name: &str) -> Request<(), ScrapeConfigResponse> {
        self.request(
            Method::Get,
            format!(
                "{}/scrapeconfigs/{}",
                Self::instance_path(project_id, instance_id),
                segment(job_name)
            ),
        )
    }

    /// Creates a scrape config.
    #[must_use]
    pub fn create_scrape_config(
        &self,
        project_id: &str,
        instance_id: &str,
    ) -> Request<CreateScrapeConfigPayload, ScrapeConfigList> {
        self.request(
            Method::Post,
            format!("{}/scrapeconfigs", Self::instance_path(project_id, instance_id)),
        )
    }

    /// Replaces a scrape config.
    #[must_use]
    pub fn update_scrape_config(
        &self,
        project_id: &str,
        instance_id: &str,
        job_name: &str,
    ) -> Request<UpdateScrapeConfigPayload, ScrapeConfigList> {
        self.request(
            Method::Put,
            format!(
                "{}/scrapeconfigs/{}",
                Self::instance_path(project_id, instance_id),
                segment(job_name)
            ),
        )
    }

    /// Deletes a scrape config.
    #[must_use]
    pub fn delete_scrape_config(&self, project_id: &str, instance_id: &str, job_name: &str) -> Request<(), ScrapeConfigList> {
        self.request(
            Method::Delete,
            format!(
                "{}/scrapeconfigs/{}",
                Self::instance_path(project_id, instance_id),
                segment(job_name)
            ),
        )
    }

    /// Lists the credentials of an instance.
    #[must_use]
    pub fn list_credentials(&self, project_id: &str, instance_id: &str) -> Request<(), CredentialsList> {
        self.request(
            Method::Get,
            format!("{}/credentials", Self::instance_path(project_id, instance_id)),
        )
    }

    /// Creates technical credentials.
    #[must_use]
    pub fn create_credentials(&self, project_id: &str, instance_id: &str) -> Request<(), CreateCredentialsResponse> {
        self.request(
            Method::Post,
            format!("{}/credentials", Self::instance_path(project_id, instance_id)),
        )
    }

    /// Deletes technical credentials.
    #[must_use]
    pub fn delete_credentials(&self, project_id: &str, instance_id: &str, username: &str) -> Request<(), NoContent> {
        self.request(
            Method::Delete,
            format!(
                "{}/credentials/{}",
                Self::instance_path(project_id, instance_id),
                segment(username)
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_job_serializes_to_documented_shape() {
        let value = serde_json::to_value(CreateScrapeConfigPayload::default_job()).expect("encode");
        assert_eq!(
            value,
            serde_json::json!({
                "jobName": "default-name",
                "metricsPath": "/metrics",
                "scheme": "https",
                "scrapeInterval": "5m",
                "scrapeTimeout": "2m",
                "staticConfigs": [{"targets": ["url-target"]}]
            })
        );
    }

    #[test]
    fn scrape_config_maps_to_update_payload() {
        let config = ScrapeConfig {
            job_name: "job".into(),
            metrics_path: "/m".into(),
            scheme: "http".into(),
            scrape_interval: "1m".into(),
            scrape_timeout: "30s".into(),
            static_configs: vec![StaticConfig {
                targets: vec!["a:9100".into()],
                labels: Some(BTreeMap::from([("env".to_owned(), "prod".to_owned())])),
            }],
            honor_labels: Some(true),
            ..Default::default()
        };
        let payload = UpdateScrapeConfigPayload::from(config);
        let value = serde_json::to_value(&payload).expect("encode");
        assert!(value.get("jobName").is_none());
        assert_eq!(value["scheme"], "http");
        assert_eq!(value["honorLabels"], true);
        assert_eq!(value["staticConfigs"][0]["labels"]["env"], "prod");
    }

    #[test]
    fn grafana_configs_decode_partial_settings() {
        let configs: GrafanaConfigs =
            serde_json::from_value(serde_json::json!({"publicReadAccess": true, "useStackitSso": false}))
                .expect("decode");
        assert_eq!(configs.public_read_access, Some(true));
        assert_eq!(configs.use_stackit_sso, Some(false));
        assert!(configs.generic_oauth.is_none());
    }
}
