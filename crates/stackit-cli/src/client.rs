//! Construction of the SDK clients used by commands.

use std::sync::Arc;
use std::time::Duration;

use stackit_sdk::kms::KmsClient;
use stackit_sdk::observability::ObservabilityClient;
use stackit_sdk::resourcemanager::ResourceManagerClient;
use stackit_sdk::sfs::SfsClient;
use stackit_sdk::{HttpTransport, Transport, TransportConfig};

use crate::config::Profile;
use crate::error::{CliError, Result};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("stackit-cli/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout of the HTTP transports.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Inputs to client construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSettings {
    /// Region of the invocation.
    pub region: String,
    /// Bearer token, if any.
    pub token: Option<String>,
    /// KMS endpoint override.
    pub kms_endpoint: Option<String>,
    /// SFS endpoint override.
    pub sfs_endpoint: Option<String>,
    /// Observability endpoint override.
    pub observability_endpoint: Option<String>,
    /// Resource Manager endpoint override.
    pub resource_manager_endpoint: Option<String>,
    /// User agent.
    pub user_agent: String,
}

impl ClientSettings {
    /// Settings for a region with endpoint overrides from the profile.
    #[must_use]
    pub fn new(region: &str, token: Option<String>, profile: &Profile) -> Self {
        Self {
            region: region.to_owned(),
            token,
            kms_endpoint: profile.kms_custom_endpoint.clone(),
            sfs_endpoint: profile.sfs_custom_endpoint.clone(),
            observability_endpoint: profile.observability_custom_endpoint.clone(),
            resource_manager_endpoint: profile.resource_manager_custom_endpoint.clone(),
            user_agent: USER_AGENT.to_owned(),
        }
    }
}

/// Typed clients for one invocation.
#[derive(Clone)]
pub struct Clients {
    /// KMS API.
    pub kms: KmsClient,
    /// SFS API.
    pub sfs: SfsClient,
    /// Observability API.
    pub observability: ObservabilityClient,
    /// Resource Manager API, used for display labels.
    pub resource_manager: ResourceManagerClient,
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients").finish_non_exhaustive()
    }
}

impl Clients {
    /// Every client on top of the same transport.
    #[must_use]
    pub fn with_transport(transport: &Arc<dyn Transport>) -> Self {
        Self {
            kms: KmsClient::new(Arc::clone(transport)),
            sfs: SfsClient::new(Arc::clone(transport)),
            observability: ObservabilityClient::new(Arc::clone(transport)),
            resource_manager: ResourceManagerClient::new(Arc::clone(transport)),
        }
    }
}

/// Builds [`Clients`] from settings.
pub trait ClientFactory: Send + Sync {
    /// Configures the clients.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if an endpoint cannot be used.
    fn configure(&self, settings: &ClientSettings) -> Result<Clients>;
}

/// Factory producing reqwest-backed clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

impl HttpClientFactory {
    fn transport(endpoint: Option<&str>, default: &str, settings: &ClientSettings) -> Result<Arc<dyn Transport>> {
        let endpoint = endpoint.unwrap_or(default);
        let config = TransportConfig::new(endpoint)
            .with_token(settings.token.clone())
            .with_user_agent(settings.user_agent.clone())
            .with_timeout(REQUEST_TIMEOUT);
        let transport = HttpTransport::new(config).map_err(|e| CliError::Config {
            path: format!("endpoint {endpoint}"),
            message: e.to_string(),
        })?;
        Ok(Arc::new(transport))
    }
}

impl ClientFactory for HttpClientFactory {
    fn configure(&self, settings: &ClientSettings) -> Result<Clients> {
        tracing::debug!(region = %settings.region, authenticated = settings.token.is_some(), "configuring API clients");
        Ok(Clients {
            kms: KmsClient::new(Self::transport(
                settings.kms_endpoint.as_deref(),
                stackit_sdk::kms::DEFAULT_ENDPOINT,
                settings,
            )?),
            sfs: SfsClient::new(Self::transport(
                settings.sfs_endpoint.as_deref(),
                stackit_sdk::sfs::DEFAULT_ENDPOINT,
                settings,
            )?),
            observability: ObservabilityClient::new(Self::transport(
                settings.observability_endpoint.as_deref(),
                stackit_sdk::observability::DEFAULT_ENDPOINT,
                settings,
            )?),
            resource_manager: ResourceManagerClient::new(Self::transport(
                settings.resource_manager_endpoint.as_deref(),
                stackit_sdk::resourcemanager::DEFAULT_ENDPOINT,
                settings,
            )?),
        })
    }
}
