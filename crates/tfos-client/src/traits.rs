//! Service trait definitions for the OpenStack clients.
//!
//! This module defines the interfaces the provider handlers call, together
//! with the request and response types of the Placement v1 and Key Manager v1
//! APIs they mirror.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Errors that can occur when talking to an OpenStack service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No suitable endpoint could be found in the service catalog: {0}")]
    EndpointNotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns true when the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }

    /// Returns true for an optimistic-concurrency (generation) mismatch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Configuration for a single service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Catalog service type (e.g. "placement", "key-manager").
    pub service_type: String,
    /// Base URL requests are resolved against.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    /// Microversion sent in the `OpenStack-API-Version` header.
    #[serde(default)]
    pub microversion: Option<String>,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Placement v1
// ---------------------------------------------------------------------------

/// A link attached to a resource provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

/// A Placement resource provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProvider {
    pub uuid: String,
    pub name: String,
    pub generation: i64,
    #[serde(default)]
    pub parent_provider_uuid: Option<String>,
    #[serde(default)]
    pub root_provider_uuid: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Filters for listing resource providers. Unset filters are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOpts {
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub member_of: Option<String>,
    pub resources: Option<String>,
    pub in_tree: Option<String>,
    pub required: Option<String>,
}

impl ListOpts {
    /// Query parameters for the non-empty filters, in a stable order.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        [
            ("name", &self.name),
            ("uuid", &self.uuid),
            ("member_of", &self.member_of),
            ("resources", &self.resources),
            ("in_tree", &self.in_tree),
            ("required", &self.required),
        ]
        .into_iter()
        .filter_map(|(key, value)| match value {
            Some(v) if !v.is_empty() => Some((key, v.clone())),
            _ => None,
        })
        .collect()
    }
}

/// Body of a resource provider create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOpts {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_provider_uuid: Option<String>,
}

/// Body of a resource provider update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_provider_uuid: Option<String>,
}

/// Inventory of one resource class on a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub allocation_ratio: f64,
    pub max_unit: i64,
    pub min_unit: i64,
    pub reserved: i64,
    pub step_size: i64,
    pub total: i64,
}

/// All inventories of a provider, keyed by resource class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProviderInventories {
    pub resource_provider_generation: i64,
    #[serde(default)]
    pub inventories: BTreeMap<String, Inventory>,
}

/// Body of an inventories replace request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateInventoriesOpts {
    pub resource_provider_generation: i64,
    pub inventories: BTreeMap<String, Inventory>,
}

/// Traits associated with a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProviderTraits {
    pub resource_provider_generation: i64,
    #[serde(default)]
    pub traits: Vec<String>,
}

/// Body of a traits replace request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTraitsOpts {
    pub resource_provider_generation: i64,
    pub traits: Vec<String>,
}

/// Consumed amounts per resource class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProviderUsage {
    pub resource_provider_generation: i64,
    #[serde(default)]
    pub usages: BTreeMap<String, i64>,
}

/// Placement v1 API.
#[async_trait]
pub trait PlacementService: Send + Sync {
    /// Lists resource providers matching the filters.
    async fn list_resource_providers(&self, opts: &ListOpts)
        -> ServiceResult<Vec<ResourceProvider>>;

    /// Creates a resource provider.
    async fn create_resource_provider(&self, opts: &CreateOpts)
        -> ServiceResult<ResourceProvider>;

    /// Gets a resource provider by UUID.
    async fn get_resource_provider(&self, uuid: &str) -> ServiceResult<ResourceProvider>;

    /// Updates the name and/or parent of a resource provider.
    async fn update_resource_provider(
        &self,
        uuid: &str,
        opts: &UpdateOpts,
    ) -> ServiceResult<ResourceProvider>;

    /// Deletes a resource provider.
    async fn delete_resource_provider(&self, uuid: &str) -> ServiceResult<()>;

    /// Gets the usages of a resource provider.
    async fn get_usages(&self, uuid: &str) -> ServiceResult<ResourceProviderUsage>;

    /// Gets the inventories of a resource provider.
    async fn get_inventories(&self, uuid: &str) -> ServiceResult<ResourceProviderInventories>;

    /// Replaces all inventories of a resource provider.
    async fn update_inventories(
        &self,
        uuid: &str,
        opts: &UpdateInventoriesOpts,
    ) -> ServiceResult<ResourceProviderInventories>;

    /// Deletes all inventories of a resource provider.
    async fn delete_inventories(&self, uuid: &str) -> ServiceResult<()>;

    /// Gets the traits of a resource provider.
    async fn get_traits(&self, uuid: &str) -> ServiceResult<ResourceProviderTraits>;

    /// Replaces all traits of a resource provider.
    async fn update_traits(
        &self,
        uuid: &str,
        opts: &UpdateTraitsOpts,
    ) -> ServiceResult<ResourceProviderTraits>;

    /// Removes all traits from a resource provider.
    async fn delete_traits(&self, uuid: &str) -> ServiceResult<()>;
}

// ---------------------------------------------------------------------------
// Key Manager v1
// ---------------------------------------------------------------------------

/// The ACL type exposed by the provider.
pub const ACL_TYPE_READ: &str = "read";

/// ACL settings for one operation type on a secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclDetails {
    #[serde(rename = "project-access", default = "default_project_access")]
    pub project_access: bool,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default, with = "acl_timestamp", skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDateTime>,
    #[serde(default, with = "acl_timestamp", skip_serializing_if = "Option::is_none")]
    pub updated: Option<NaiveDateTime>,
}

fn default_project_access() -> bool {
    true
}

impl Default for AclDetails {
    fn default() -> Self {
        Self {
            project_access: default_project_access(),
            users: Vec::new(),
            created: None,
            updated: None,
        }
    }
}

/// ACL of a secret, keyed by operation type.
pub type SecretAcl = BTreeMap<String, AclDetails>;

/// One entry of an ACL set/update request.
#[derive(Debug, Clone, PartialEq)]
pub struct AclSetOpt {
    pub acl_type: String,
    pub users: Option<Vec<String>>,
    pub project_access: Option<bool>,
}

/// A full ACL set/update request.
pub type AclSetOpts = Vec<AclSetOpt>;

/// Builds the JSON body for an ACL set/update request.
pub fn acl_request_body(opts: &[AclSetOpt]) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    for opt in opts {
        let mut entry = serde_json::Map::new();
        if let Some(users) = &opt.users {
            entry.insert("users".to_string(), serde_json::json!(users));
        }
        if let Some(project_access) = opt.project_access {
            entry.insert(
                "project-access".to_string(),
                serde_json::Value::Bool(project_access),
            );
        }
        body.insert(opt.acl_type.clone(), serde_json::Value::Object(entry));
    }
    serde_json::Value::Object(body)
}

/// Reference to a secret ACL, returned by set and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclRef {
    pub acl_ref: String,
}

/// Key Manager v1 secret ACL API.
#[async_trait]
pub trait KeyManagerService: Send + Sync {
    /// Gets the ACL of a secret.
    async fn get_secret_acl(&self, secret_id: &str) -> ServiceResult<SecretAcl>;

    /// Replaces the ACL of a secret.
    async fn set_secret_acl(&self, secret_id: &str, opts: &[AclSetOpt]) -> ServiceResult<AclRef>;

    /// Partially updates the ACL of a secret.
    async fn update_secret_acl(&self, secret_id: &str, opts: &[AclSetOpt])
        -> ServiceResult<AclRef>;

    /// Deletes the ACL of a secret, restoring the project-wide default.
    async fn delete_secret_acl(&self, secret_id: &str) -> ServiceResult<()>;
}

/// Barbican ACL timestamps: naive, second precision on output, optional
/// fractional seconds on input.
pub mod acl_timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Output format of ACL timestamps.
    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    /// Parses an ACL timestamp.
    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(value)
                    .ok()
                    .map(|dt| dt.naive_utc())
            })
    }

    /// Renders an ACL timestamp.
    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(&format(v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        }
    }
}
