//! Resource Manager: project metadata used for display labels.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::request::{Request, segment};
use crate::transport::{Method, Transport};

/// Default Resource Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://resource-manager.api.stackit.cloud";

/// A project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Project {
    /// Project UUID.
    pub project_id: String,
    /// Human readable container ID.
    pub container_id: String,
    /// Display name.
    pub name: String,
    /// Lifecycle state, e.g. `ACTIVE`.
    pub lifecycle_state: String,
    /// Labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Client for the Resource Manager API.
#[derive(Clone)]
pub struct ResourceManagerClient {
    transport: Arc<dyn Transport>,
}

impl ResourceManagerClient {
    /// Creates a client on top of a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Gets a project by ID.
    #[must_use]
    pub fn get_project(&self, project_id: &str) -> Request<(), Project> {
        Request::new(
            &self.transport,
            Method::Get,
            format!("/v2/projects/{}", segment(project_id)),
        )
    }
}
