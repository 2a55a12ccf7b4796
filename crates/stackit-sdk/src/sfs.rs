//! Shared File Storage: resource pools, shares, export policies and snapshots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::{NoContent, Request, segment};
use crate::transport::{Method, Transport};

/// Default SFS endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://sfs.api.stackit.cloud";

/// Performance classes offered for resource pools.
pub const PERFORMANCE_CLASSES: &[&str] = &["Standard", "Premium", "Extreme"];

/// Storage capacity in which shares are created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourcePool {
    /// Resource pool ID.
    pub id: String,
    /// Name.
    pub name: String,
    /// Availability zone, e.g. `eu01-m`.
    pub availability_zone: String,
    /// Performance class name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_class: Option<String>,
    /// Provisioned size in GB.
    pub size_gigabytes: i64,
    /// CIDR blocks allowed to mount the pool.
    pub ip_acl: Vec<String>,
    /// Whether the `.snapshot` directory is visible.
    pub snapshots_are_visible: bool,
    /// Path to mount the pool from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    /// Lifecycle state.
    pub state: String,
    /// Number of shares in the pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_shares: Option<i64>,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of a resource pool creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourcePoolPayload {
    /// Name.
    pub name: String,
    /// Availability zone.
    pub availability_zone: String,
    /// Performance class.
    pub performance_class: String,
    /// Size in GB.
    pub size_gigabytes: i64,
    /// CIDR blocks allowed to mount the pool.
    pub ip_acl: Vec<String>,
    /// Whether the `.snapshot` directory is visible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots_are_visible: Option<bool>,
}

/// Body of a resource pool update. Unset fields keep their server value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourcePoolPayload {
    /// New performance class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_class: Option<String>,
    /// New size in GB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_gigabytes: Option<i64>,
    /// New ACL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_acl: Option<Vec<String>>,
    /// New snapshot visibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots_are_visible: Option<bool>,
}

impl UpdateResourcePoolPayload {
    /// Returns true if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.performance_class.is_none()
            && self.size_gigabytes.is_none()
            && self.ip_acl.is_none()
            && self.snapshots_are_visible.is_none()
    }
}

/// Envelope around a single resource pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourcePoolResponse {
    /// The resource pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_pool: Option<ResourcePool>,
}

/// Response of the resource pool listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourcePoolList {
    /// Resource pools of the project.
    pub resource_pools: Vec<ResourcePool>,
}

/// Export policy reference as embedded in a share.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportPolicy {
    /// Export policy ID.
    pub id: String,
    /// Name.
    pub name: String,
    /// Ordered access rules.
    pub rules: Vec<ExportPolicyRule>,
    /// Number of shares using the policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_using_export_policy: Option<i64>,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A single rule of an export policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportPolicyRule {
    /// Rule ID, assigned by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Evaluation order.
    pub order: i64,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// CIDR blocks the rule applies to.
    pub ip_acl: Vec<String>,
    /// Mount read-only.
    pub read_only: bool,
    /// Honour set-uid bits.
    pub set_uuid: bool,
    /// Allow root access.
    pub super_user: bool,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of an export policy creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExportPolicyPayload {
    /// Name.
    pub name: String,
    /// Initial rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<ExportPolicyRule>>,
}

/// Body of an export policy update. An empty rule list removes all rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExportPolicyPayload {
    /// Replacement rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<ExportPolicyRule>>,
}

/// Envelope around a single export policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportPolicyResponse {
    /// The export policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_export_policy: Option<ExportPolicy>,
}

/// Response of the export policy listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportPolicyList {
    /// Export policies of the project.
    pub share_export_policies: Vec<ExportPolicy>,
}

/// A share inside a resource pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Share {
    /// Share ID.
    pub id: String,
    /// Name.
    pub name: String,
    /// Lifecycle state.
    pub state: String,
    /// Mount path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    /// Hard space limit in GB.
    pub space_hard_limit_gigabytes: i64,
    /// Export policy in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_policy: Option<ExportPolicy>,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of a share creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSharePayload {
    /// Name.
    pub name: String,
    /// Hard space limit in GB.
    pub space_hard_limit_gigabytes: i64,
    /// Export policy to attach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_policy_name: Option<String>,
}

/// Body of a share update. Unset fields keep their server value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSharePayload {
    /// New export policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_policy_name: Option<String>,
    /// New hard space limit in GB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_hard_limit_gigabytes: Option<i64>,
}

impl UpdateSharePayload {
    /// Returns true if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.export_policy_name.is_none() && self.space_hard_limit_gigabytes.is_none()
    }
}

/// Envelope around a single share.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShareResponse {
    /// The share.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<Share>,
}

/// Response of the share listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShareList {
    /// Shares of the resource pool.
    pub shares: Vec<Share>,
}

/// A point-in-time snapshot of a resource pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshot {
    /// Snapshot name, unique within the pool.
    pub name: String,
    /// Optional comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// ID of the snapshotted pool.
    pub resource_pool_id: String,
    /// Allocated size in GB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_gigabytes: Option<i64>,
    /// Logical size in GB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_size_gigabytes: Option<i64>,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of a snapshot creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotPayload {
    /// Snapshot name.
    pub name: String,
    /// Optional comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Envelope around a single snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotResponse {
    /// The snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_pool_snapshot: Option<Snapshot>,
}

/// Response of the snapshot listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotList {
    /// Snapshots of the resource pool.
    pub resource_pool_snapshots: Vec<Snapshot>,
}

/// Client for the SFS API.
#[derive(Clone)]
pub struct SfsClient {
    transport: Arc<dyn Transport>,
}

impl SfsClient {
    /// Creates a client on top of a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn base(project_id: &str, region: &str) -> String {
        format!(
            "/v1beta/projects/{}/regions/{}",
            segment(project_id),
            segment(region)
        )
    }

    fn pool_path(project_id: &str, region: &str, pool_id: &str) -> String {
        format!("{}/resourcePools/{}", Self::base(project_id, region), segment(pool_id))
    }

    fn policy_path(project_id: &str, region: &str, policy_id: &str) -> String {
        format!(
            "{}/shareExportPolicies/{}",
            Self::base(project_id, region),
            segment(policy_id)
        )
    }

    fn request<P, R>(&self, method: Method, path: String) -> Request<P, R>
    where
        P: Serialize + Send + Sync,
        R: serde::de::DeserializeOwned,
    {
        Request::new(&self.transport, method, path)
    }

    /// Lists resource pools.
    #[must_use]
    pub fn list_resource_pools(&self, project_id: &str, region: &str) -> Request<(), ResourcePoolList> {
        self.request(Method::Get, format!("{}/resourcePools", Self::base(project_id, region)))
    }

    /// Gets a resource pool.
    #[must_use]
    pub fn get_resource_pool(&self, project_id: &str, region: &str, pool_id: &str) -> Request<(), ResourcePoolResponse> {
        self.request(Method::Get, Self::pool_path(project_id, region, pool_id))
    }

    /// Creates a resource pool.
    #[must_use]
    pub fn create_resource_pool(
        &self,
        project_id: &str,
        region: &str,
    ) -> Request<CreateResourcePoolPayload, ResourcePoolResponse> {
        self.request(Method::Post, format!("{}/resourcePools", Self::base(project_id, region)))
    }

    /// Updates a resource pool.
    #[must_use]
    pub fn update_resource_pool(
        &self,
        project_id: &str,
        region: &str,
        pool_id: &str,
    ) -> Request<UpdateResourcePoolPayload, ResourcePoolResponse> {
        self.request(Method::Patch, Self::pool_path(project_id, region, pool_id))
    }

    /// Deletes a resource pool.
    #[must_use]
    pub fn delete_resource_pool(&self, project_id: &str, region: &str, pool_id: &str) -> Request<(), NoContent> {
        self.request(Method::Delete, Self::pool_path(project_id, region, pool_id))
    }

    /// Lists the shares of a resource pool.
    #[must_use]
    pub fn list_shares(&self, project_id: &str, region: &str, pool_id: &str) -> Request<(), ShareList> {
        self.request(
            Method::Get,
            format!("{}/shares", Self::pool_path(project_id, region, pool_id)),
        )
    }

    /// Gets a share.
    #[must_use]
    pub fn get_share(&self, project_id: &str, region: &str, pool_id: &str, share_id: &str) -> Request<(), ShareResponse> {
        self.request(
            Method::Get,
            format!("{}/shares/{}", Self::pool_path(project_id, region, pool_id), segment(share_id)),
        )
    }

    /// Creates a share.
    #[must_use]
    pub fn create_share(&self, project_id: &str, region: &str, pool_id: &str) -> Request<CreateSharePayload, ShareResponse> {
        self.request(
            Method::Post,
            format!("{}/shares", Self::pool_path(project_id, region, pool_id)),
        )
    }

    /// Updates a share.
    #[must_use]
    pub fn update_share(
        &self,
        project_id: &str,
        region: &str,
        pool_id: &str,
        share_id: &str,
    ) -> Request<UpdateSharePayload, ShareResponse> {
        self.request(
            Method::Patch,
            format!("{}/shares/{}", Self::pool_path(project_id, region, pool_id), segment(share_id)),
        )
    }

    /// Deletes a share.
    #[must_use]
    pub fn delete_share(&self, project_id: &str, region: &str, pool_id: &str, share_id: &str) -> Request<(), NoContent> {
        self.request(
            Method::Delete,
            format!("{}/shares/{}", Self::pool_path(project_id, region, pool_id), segment(share_id)),
        )
    }

    /// Lists export policies.
    #[must_use]
    pub fn list_export_policies(&self, project_id: &str, region: &str) -> Request<(), ExportPolicyList> {
        self.request(
            Method::Get,
            format!("{}/shareExportPolicies", Self::base(project_id, region)),
        )
    }

    /// Gets an export policy.
    #[must_use]
    pub fn get_export_policy(&self, project_id: &str, region: &str, policy_id: &str) -> Request<(), ExportPolicyResponse> {
        self.request(Method::Get, Self::policy_path(project_id, region, policy_id))
    }

    /// Creates an export policy.
    #[must_use]
    pub fn create_export_policy(
        &self,
        project_id: &str,
        region: &str,
    ) -> Request<CreateExportPolicyPayload, ExportPolicyResponse> {
        self.request(
            Method::Post,
            format!("{}/shareExportPolicies", Self::base(project_id, region)),
        )
    }

    /// Updates an export policy.
    #[must_use]
    pub fn update_export_policy(
        &self,
        project_id: &str,
        region: &str,
        policy_id: &str,
    ) -> Request<UpdateExportPolicyPayload, ExportPolicyResponse> {
        self.request(Method::Patch, Self::policy_path(project_id, region, policy_id))
    }

    /// Deletes an export policy.
    #[must_use]
    pub fn delete_export_policy(&self, project_id: &str, region: &str, policy_id: &str) -> Request<(), NoContent> {
        self.request(Method::Delete, Self::policy_path(project_id, region, policy_id))
    }

    /// Lists the snapshots of a resource pool.
    #[must_use]
    pub fn list_snapshots(&self, project_id: &str, region: &str, pool_id: &str) -> Request<(), SnapshotList> {
        self.request(
            Method::Get,
            format!("{}/snapshots", Self::pool_path(project_id, region, pool_id)),
        )
    }

    /// Gets a snapshot by name.
    #[must_use]
    pub fn get_snapshot(&self, project_id: &str, region: &str, pool_id: &str, name: &str) -> Request<(), SnapshotResponse> {
        self.request(
            Method::Get,
            format!("{}/snapshots/{}", Self::pool_path(project_id, region, pool_id), segment(name)),
        )
    }

    /// Creates a snapshot.
    #[must_use]
    pub fn create_snapshot(
        &self,
        project_id: &str,
        region: &str,
        pool_id: &str,
    ) -> Request<CreateSnapshotPayload, SnapshotResponse> {
        self.request(
            Method::Post,
            format!("{}/snapshots", Self::pool_path(project_id, region, pool_id)),
        )
    }

    /// Deletes a snapshot by name.
    #[must_use]
    pub fn delete_snapshot(&self, project_id: &str, region: &str, pool_id: &str, name: &str) -> Request<(), NoContent> {
        self.request(
            Method::Delete,
            format!("{}/snapshots/{}", Self::pool_path(project_id, region, pool_id), segment(name)),
        )
    }
}
