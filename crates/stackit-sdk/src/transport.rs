//! Transport layer: the single seam between typed requests and the network.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Result, SdkError};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

/// A fully described API call, independent of the endpoint it is sent to.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the service endpoint, starting with `/`.
    pub path: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

/// Sends [`ApiCall`]s and returns the decoded JSON body.
///
/// `Ok(None)` means the call succeeded with an empty body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a single call.
    async fn send(&self, call: ApiCall) -> Result<Option<Value>>;
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the service, e.g. `https://kms.api.stackit.cloud`.
    pub endpoint: String,
    /// Bearer token. Calls fail with [`SdkError::Unauthenticated`] without one.
    pub token: Option<String>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl TransportConfig {
    /// Creates a configuration for the given endpoint with default settings.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: None,
            user_agent: concat!("stackit-sdk/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`Transport`] backed by a `reqwest` client.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Builds a transport from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if the endpoint is not an absolute
    /// http(s) URL or the HTTP client cannot be built.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim_end_matches('/').to_owned();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(SdkError::Config {
                message: format!("endpoint {endpoint:?} must start with http:// or https://"),
            });
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| SdkError::Config {
                message: format!("build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint,
            token: config.token.filter(|t| !t.is_empty()),
        })
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, call: ApiCall) -> Result<Option<Value>> {
        let token = self.token.as_deref().ok_or(SdkError::Unauthenticated)?;
        let url = format!("{}{}", self.endpoint, call.path);
        debug!(method = %call.method, %url, "sending API request");
        if let Some(body) = &call.body {
            trace!(%body, "request body");
        }

        let mut request = self
            .client
            .request(call.method.into(), &url)
            .bearer_auth(token);
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SdkError::transport(format!("{} {url}: {e}", call.method)))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SdkError::transport(format!("read response body: {e}")))?;
        debug!(status = status.as_u16(), bytes = bytes.len(), "received API response");

        if !status.is_success() {
            return Err(SdkError::http(status.as_u16(), &bytes));
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
