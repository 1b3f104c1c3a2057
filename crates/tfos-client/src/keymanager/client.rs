//! Key Manager v1 HTTP client.

use crate::http::{HttpClient, RequestAuth};
use crate::traits::{
    acl_request_body, AclRef, AclSetOpt, KeyManagerService, SecretAcl, ServiceConfig,
    ServiceResult,
};
use async_trait::async_trait;
use tracing::{info, instrument};

/// API version segment of Key Manager URLs.
const API_VERSION: &str = "v1";

/// Key Manager service client.
pub struct KeyManagerClient {
    client: HttpClient,
}

impl KeyManagerClient {
    /// Creates a client. Catalog endpoints are unversioned, so `/v1` is
    /// appended unless already present.
    pub fn new(mut config: ServiceConfig, auth: RequestAuth) -> ServiceResult<Self> {
        config.base_url = versioned_endpoint(&config.base_url);
        Self::from_http(HttpClient::new(config, auth)?)
    }

    /// Creates a client sharing an existing connection pool.
    pub fn with_client(
        client: reqwest::Client,
        mut config: ServiceConfig,
        auth: RequestAuth,
    ) -> ServiceResult<Self> {
        config.base_url = versioned_endpoint(&config.base_url);
        Self::from_http(HttpClient::with_client(client, config, auth)?)
    }

    fn from_http(client: HttpClient) -> ServiceResult<Self> {
        info!("Key Manager client initialized for '{}'", client.base_url());
        Ok(Self { client })
    }

    fn acl_path(secret_id: &str) -> String {
        format!("/secrets/{}/acl", urlencoding::encode(secret_id))
    }
}

/// Appends the API version to an endpoint unless it already ends with it.
pub fn versioned_endpoint(endpoint: &str) -> String {
    if endpoint.is_empty() {
        return String::new();
    }
    let base = endpoint.trim_end_matches('/');
    if base.ends_with(&format!("/{}", API_VERSION)) {
        base.to_string()
    } else {
        format!("{}/{}", base, API_VERSION)
    }
}

#[async_trait]
impl KeyManagerService for KeyManagerClient {
    #[instrument(skip(self))]
    async fn get_secret_acl(&self, secret_id: &str) -> ServiceResult<SecretAcl> {
        self.client.get_json(&Self::acl_path(secret_id)).await
    }

    #[instrument(skip(self))]
    async fn set_secret_acl(&self, secret_id: &str, opts: &[AclSetOpt]) -> ServiceResult<AclRef> {
        self.client
            .put_json(&Self::acl_path(secret_id), &acl_request_body(opts))
            .await
    }

    #[instrument(skip(self))]
    async fn update_secret_acl(
        &self,
        secret_id: &str,
        opts: &[AclSetOpt],
    ) -> ServiceResult<AclRef> {
        self.client
            .patch_json(&Self::acl_path(secret_id), &acl_request_body(opts))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_secret_acl(&self, secret_id: &str) -> ServiceResult<()> {
        self.client.delete(&Self::acl_path(secret_id)).await
    }
}
