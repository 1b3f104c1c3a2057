//! Construction of region-scoped service clients.

use crate::http::{build_client, RequestAuth};
use crate::identity::Interface;
use crate::keymanager::{KeyManagerClient, MockKeyManagerService};
use crate::placement::{MockPlacementService, PlacementClient};
use crate::traits::{
    KeyManagerService, PlacementService, ServiceConfig, ServiceError, ServiceResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Catalog type of the Placement service.
pub const PLACEMENT_SERVICE_TYPE: &str = "placement";

/// Catalog type of the Key Manager service.
pub const KEY_MANAGER_SERVICE_TYPE: &str = "key-manager";

/// Hands out service clients for a region.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Placement v1 client for `region`.
    async fn placement_v1(&self, region: &str) -> ServiceResult<Arc<dyn PlacementService>>;

    /// Key Manager v1 client for `region`.
    async fn key_manager_v1(&self, region: &str) -> ServiceResult<Arc<dyn KeyManagerService>>;
}

/// Options applied to every client the factory builds.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub interface: Interface,
    /// Endpoint URLs keyed by service type, used instead of the catalog.
    pub endpoint_overrides: HashMap<String, String>,
    pub timeout_secs: u64,
    pub verify_tls: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            interface: Interface::Public,
            endpoint_overrides: HashMap::new(),
            timeout_secs: 30,
            verify_tls: true,
        }
    }
}

/// Factory backed by real OpenStack endpoints.
///
/// All clients share one authentication and one connection pool, so a token
/// is issued at most once per validity period no matter how many clients are
/// built. Clients are cached per region.
pub struct OpenStackClientFactory {
    auth: RequestAuth,
    options: ClientOptions,
    http: reqwest::Client,
    placement: Mutex<HashMap<String, Arc<dyn PlacementService>>>,
    key_manager: Mutex<HashMap<String, Arc<dyn KeyManagerService>>>,
}

impl OpenStackClientFactory {
    pub fn new(auth: RequestAuth, options: ClientOptions) -> ServiceResult<Self> {
        let http = build_client(options.timeout_secs, options.verify_tls, "service endpoints")?;
        Ok(Self {
            auth,
            options,
            http,
            placement: Mutex::new(HashMap::new()),
            key_manager: Mutex::new(HashMap::new()),
        })
    }

    /// Resolves the endpoint of a service, preferring explicit overrides.
    pub async fn endpoint(&self, service_type: &str, region: &str) -> ServiceResult<String> {
        if let Some(url) = self.options.endpoint_overrides.get(service_type) {
            debug!(service_type, url = %url, "Using endpoint override");
            return Ok(url.clone());
        }
        match &self.auth {
            RequestAuth::Session(session) => session.catalog().await?.endpoint_for(
                service_type,
                region,
                self.options.interface,
            ),
            _ => Err(ServiceError::EndpointNotFound(format!(
                "no catalog available and no endpoint override for '{}'",
                service_type
            ))),
        }
    }

    fn service_config(&self, service_type: &str, base_url: String) -> ServiceConfig {
        ServiceConfig {
            service_type: service_type.to_string(),
            base_url,
            timeout_secs: self.options.timeout_secs,
            verify_tls: self.options.verify_tls,
            microversion: None,
            headers: HashMap::new(),
        }
    }
}

#[async_trait]
impl ClientFactory for OpenStackClientFactory {
    async fn placement_v1(&self, region: &str) -> ServiceResult<Arc<dyn PlacementService>> {
        let mut cache = self.placement.lock().await;
        if let Some(client) = cache.get(region) {
            return Ok(Arc::clone(client));
        }
        let url = self.endpoint(PLACEMENT_SERVICE_TYPE, region).await?;
        let client: Arc<dyn PlacementService> = Arc::new(PlacementClient::with_client(
            self.http.clone(),
            self.service_config(PLACEMENT_SERVICE_TYPE, url),
            self.auth.clone(),
        )?);
        cache.insert(region.to_string(), Arc::clone(&client));
        Ok(client)
    }

    async fn key_manager_v1(&self, region: &str) -> ServiceResult<Arc<dyn KeyManagerService>> {
        let mut cache = self.key_manager.lock().await;
        if let Some(client) = cache.get(region) {
            return Ok(Arc::clone(client));
        }
        let url = self.endpoint(KEY_MANAGER_SERVICE_TYPE, region).await?;
        let client: Arc<dyn KeyManagerService> = Arc::new(KeyManagerClient::with_client(
            self.http.clone(),
            self.service_config(KEY_MANAGER_SERVICE_TYPE, url),
            self.auth.clone(),
        )?);
        cache.insert(region.to_string(), Arc::clone(&client));
        Ok(client)
    }
}

/// Factory handing out shared in-memory services.
#[derive(Clone, Default)]
pub struct MockClientFactory {
    pub placement: MockPlacementService,
    pub key_manager: MockKeyManagerService,
    failure: Option<ServiceError>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose client construction always fails.
    pub fn failing(error: ServiceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    fn check(&self) -> ServiceResult<()> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClientFactory for MockClientFactory {
    async fn placement_v1(&self, _region: &str) -> ServiceResult<Arc<dyn PlacementService>> {
        self.check()?;
        Ok(Arc::new(self.placement.clone()))
    }

    async fn key_manager_v1(&self, _region: &str) -> ServiceResult<Arc<dyn KeyManagerService>> {
        self.check()?;
        Ok(Arc::new(self.key_manager.clone()))
    }
}
