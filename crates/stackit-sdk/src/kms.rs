//! Key Management Service: key rings, keys, key versions and wrapping keys.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::{NoContent, Request, segment};
use crate::transport::{Method, Transport};

/// Default KMS endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://kms.api.stackit.cloud";

/// Algorithms accepted for keys.
pub const KEY_ALGORITHMS: &[&str] = &[
    "aes_256_gcm",
    "rsa_2048_oaep_sha256",
    "rsa_3072_oaep_sha256",
    "rsa_4096_oaep_sha256",
    "rsa_4096_oaep_sha512",
    "hmac_sha256",
    "hmac_sha384",
    "hmac_sha512",
    "ecdsa_p256_sha256",
    "ecdsa_p384_sha384",
    "ecdsa_p521_sha512",
];

/// Purposes accepted for keys.
pub const KEY_PURPOSES: &[&str] = &[
    "symmetric_encrypt_decrypt",
    "asymmetric_encrypt_decrypt",
    "message_authentication_code",
    "asymmetric_sign_verify",
];

/// Protection levels accepted for keys and wrapping keys.
pub const PROTECTIONS: &[&str] = &["software"];

/// Algorithms accepted for wrapping keys.
pub const WRAPPING_ALGORITHMS: &[&str] = &[
    "rsa_2048_oaep_sha256",
    "rsa_3072_oaep_sha256",
    "rsa_4096_oaep_sha256",
    "rsa_4096_oaep_sha512",
    "rsa_2048_oaep_sha256_aes_256_key_wrap",
    "rsa_3072_oaep_sha256_aes_256_key_wrap",
    "rsa_4096_oaep_sha256_aes_256_key_wrap",
    "rsa_4096_oaep_sha512_aes_256_key_wrap",
];

/// Purposes accepted for wrapping keys.
pub const WRAPPING_PURPOSES: &[&str] = &["wrap_symmetric_key", "wrap_asymmetric_key"];

/// A container for keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyRing {
    /// Key ring ID.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lifecycle state (`creating`, `active`, `deleted`).
    pub state: String,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of a key ring creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyRingPayload {
    /// Display name.
    pub display_name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response of the key ring listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyRingList {
    /// Key rings of the project.
    pub key_rings: Vec<KeyRing>,
}

/// A key inside a key ring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Key {
    /// Key ID.
    pub id: String,
    /// ID of the owning key ring.
    pub key_ring_id: String,
    /// Display name.
    pub display_name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Algorithm, one of [`KEY_ALGORITHMS`].
    pub algorithm: String,
    /// Purpose, one of [`KEY_PURPOSES`].
    pub purpose: String,
    /// Protection, one of [`PROTECTIONS`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection: Option<String>,
    /// Whether versions can only be imported.
    pub import_only: bool,
    /// Lifecycle state.
    pub state: String,
    /// Date at which a scheduled deletion takes effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_date: Option<DateTime<Utc>>,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of a key creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyPayload {
    /// Display name.
    pub display_name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Algorithm.
    pub algorithm: String,
    /// Purpose.
    pub purpose: String,
    /// Protection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection: Option<String>,
    /// Whether versions can only be imported.
    pub import_only: bool,
}

/// Response of the key listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyList {
    /// Keys of the key ring.
    pub keys: Vec<Key>,
}

/// A version of a key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Version {
    /// Version number, starting at 1.
    pub number: i64,
    /// ID of the owning key.
    pub key_id: String,
    /// ID of the owning key ring.
    pub key_ring_id: String,
    /// Lifecycle state.
    pub state: String,
    /// Whether the version is disabled.
    pub disabled: bool,
    /// Public key material for asymmetric keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Date at which a scheduled destruction takes effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destroy_date: Option<DateTime<Utc>>,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Response of the version listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VersionList {
    /// Versions of the key.
    pub versions: Vec<Version>,
}

/// Body of a key material import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportKeyPayload {
    /// Base64 encoded key material, wrapped with the wrapping key.
    pub wrapped_key: String,
    /// ID of the wrapping key used.
    pub wrapping_key_id: String,
}

/// A key used to wrap key material for import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WrappingKey {
    /// Wrapping key ID.
    pub id: String,
    /// ID of the owning key ring.
    pub key_ring_id: String,
    /// Display name.
    pub display_name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Algorithm, one of [`WRAPPING_ALGORITHMS`].
    pub algorithm: String,
    /// Purpose, one of [`WRAPPING_PURPOSES`].
    pub purpose: String,
    /// Protection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection: Option<String>,
    /// PEM encoded public key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Lifecycle state.
    pub state: String,
    /// Expiry timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of a wrapping key creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWrappingKeyPayload {
    /// Display name.
    pub display_name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Algorithm.
    pub algorithm: String,
    /// Purpose.
    pub purpose: String,
    /// Protection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection: Option<String>,
}

/// Response of the wrapping key listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WrappingKeyList {
    /// Wrapping keys of the key ring.
    pub wrapping_keys: Vec<WrappingKey>,
}

/// Client for the KMS API.
#[derive(Clone)]
pub struct KmsClient {
    transport: Arc<dyn Transport>,
}

impl KmsClient {
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

    fn key_ring_path(project_id: &str, region: &str, key_ring_id: &str) -> String {
        format!("{}/keyrings/{}", Self::base(project_id, region), segment(key_ring_id))
    }

    fn key_path(project_id: &str, region: &str, key_ring_id: &str, key_id: &str) -> String {
        format!(
            "{}/keys/{}",
            Self::key_ring_path(project_id, region, key_ring_id),
            segment(key_id)
        )
    }

    fn version_path(
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        key_id: &str,
        number: i64,
    ) -> String {
        format!(
            "{}/versions/{number}",
            Self::key_path(project_id, region, key_ring_id, key_id)
        )
    }

    fn request<P, R>(&self, method: Method, path: String) -> Request<P, R>
    where
        P: Serialize + Send + Sync,
        R: serde::de::DeserializeOwned,
    {
        Request::new(&self.transport, method, path)
    }

    /// Lists key rings.
    #[must_use]
    pub fn list_key_rings(&self, project_id: &str, region: &str) -> Request<(), KeyRingList> {
        self.request(Method::Get, format!("{}/keyrings", Self::base(project_id, region)))
    }

    /// Gets a key ring.
    #[must_use]
    pub fn get_key_ring(&self, project_id: &str, region: &str, key_ring_id: &str) -> Request<(), KeyRing> {
        self.request(Method::Get, Self::key_ring_path(project_id, region, key_ring_id))
    }

    /// Creates a key ring.
    #[must_use]
    pub fn create_key_ring(&self, project_id: &str, region: &str) -> Request<CreateKeyRingPayload, KeyRing> {
        self.request(Method::Post, format!("{}/keyrings", Self::base(project_id, region)))
    }

    /// Deletes an empty key ring.
    #[must_use]
    pub fn delete_key_ring(&self, project_id: &str, region: &str, key_ring_id: &str) -> Request<(), NoContent> {
        self.request(Method::Delete, Self::key_ring_path(project_id, region, key_ring_id))
    }

    /// Lists the keys of a key ring.
    #[must_use]
    pub fn list_keys(&self, project_id: &str, region: &str, key_ring_id: &str) -> Request<(), KeyList> {
        self.request(
            Method::Get,
            format!("{}/keys", Self::key_ring_path(project_id, region, key_ring_id)),
        )
    }

    /// Gets a key.
    #[must_use]
    pub fn get_key(&self, project_id: &str, region: &str, key_ring_id: &str, key_id: &str) -> Request<(), Key> {
        self.request(Method::Get, Self::key_path(project_id, region, key_ring_id, key_id))
    }

    /// Creates a key.
    #[must_use]
    pub fn create_key(&self, project_id: &str, region: &str, key_ring_id: &str) -> Request<CreateKeyPayload, Key> {
        self.request(
            Method::Post,
            format!("{}/keys", Self::key_ring_path(project_id, region, key_ring_id)),
        )
    }

    /// Schedules a key for deletion.
    #[must_use]
    pub fn delete_key(&self, project_id: &str, region: &str, key_ring_id: &str, key_id: &str) -> Request<(), NoContent> {
        self.request(Method::Delete, Self::key_path(project_id, region, key_ring_id, key_id))
    }

    /// Cancels a scheduled key deletion.
    #[must_use]
    pub fn restore_key(&self, project_id: &str, region: &str, key_ring_id: &str, key_id: &str) -> Request<(), NoContent> {
        self.request(
            Method::Post,
            format!("{}/restore", Self::key_path(project_id, region, key_ring_id, key_id)),
        )
    }

    /// Creates a new version of a key.
    #[must_use]
    pub fn rotate_key(&self, project_id: &str, region: &str, key_ring_id: &str, key_id: &str) -> Request<(), Version> {
        self.request(
            Method::Post,
            format!("{}/rotate", Self::key_path(project_id, region, key_ring_id, key_id)),
        )
    }

    /// Imports wrapped key material as a new version.
    #[must_use]
    pub fn import_key(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        key_id: &str,
    ) -> Request<ImportKeyPayload, Version> {
        self.request(
            Method::Post,
            format!("{}/import", Self::key_path(project_id, region, key_ring_id, key_id)),
        )
    }

    /// Lists the versions of a key.
    #[must_use]
    pub fn list_versions(&self, project_id: &str, region: &str, key_ring_id: &str, key_id: &str) -> Request<(), VersionList> {
        self.request(
            Method::Get,
            format!("{}/versions", Self::key_path(project_id, region, key_ring_id, key_id)),
        )
    }

    /// Gets a key version.
    #[must_use]
    pub fn get_version(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        key_id: &str,
        number: i64,
    ) -> Request<(), Version> {
        self.request(
            Method::Get,
            Self::version_path(project_id, region, key_ring_id, key_id, number),
        )
    }

    /// Runs a state transition (`disable`, `enable`, `destroy`, `restore`) on a version.
    #[must_use]
    pub fn version_action(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        key_id: &str,
        number: i64,
        action: &str,
    ) -> Request<(), NoContent> {
        self.request(
            Method::Post,
            format!(
                "{}/{}",
                Self::version_path(project_id, region, key_ring_id, key_id, number),
                segment(action)
            ),
        )
    }

    /// Lists the wrapping keys of a key ring.
    #[must_use]
    pub fn list_wrapping_keys(&self, project_id: &str, region: &str, key_ring_id: &str) -> Request<(), WrappingKeyList> {
        self.request(
            Method::Get,
            format!("{}/wrappingkeys", Self::key_ring_path(project_id, region, key_ring_id)),
        )
    }

    /// Gets a wrapping key.
    #[must_use]
    pub fn get_wrapping_key(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        wrapping_key_id: &str,
    ) -> Request<(), WrappingKey> {
        self.request(
            Method::Get,
            format!(
                "{}/wrappingkeys/{}",
                Self::key_ring_path(project_id, region, key_ring_id),
                segment(wrapping_key_id)
            ),
        )
    }

    /// Creates a wrapping key.
    #[must_use]
    pub fn create_wrapping_key(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
    ) -> Request<CreateWrappingKeyPayload, WrappingKey> {
        self.request(
            Method::Post,
            format!("{}/wrappingkeys", Self::key_ring_path(project_id, region, key_ring_id)),
        )
    }

    /// Deletes a wrapping key.
    #[must_use]
    pub fn delete_wrapping_key(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        wrapping_key_id: &str,
    ) -> Request<(), NoContent> {
        self.request(
            Method::Delete,
            format!(
                "{}/wrappingkeys/{}",
                Self::key_ring_path(project_id, region, key_ring_id),
                segment(wrapping_key_id)
            ),
        )
    }
}
