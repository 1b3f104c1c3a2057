//! Placement v1 HTTP client.

use crate::http::{HttpClient, RequestAuth};
use crate::traits::{
    CreateOpts, ListOpts, PlacementService, ResourceProvider, ResourceProviderInventories,
    ResourceProviderTraits, ResourceProviderUsage, ServiceConfig, ServiceResult,
    UpdateInventoriesOpts, UpdateOpts, UpdateTraitsOpts,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};

/// Microversion requested when none is configured.
///
/// 1.20 is the first version where provider creation returns the provider
/// body; it also covers `in_tree`, `member_of`, `required` and
/// `parent_provider_uuid`.
pub const DEFAULT_PLACEMENT_MICROVERSION: &str = "1.20";

/// Placement service client.
pub struct PlacementClient {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct ResourceProviderList {
    resource_providers: Vec<ResourceProvider>,
}

impl PlacementClient {
    pub fn new(config: ServiceConfig, auth: RequestAuth) -> ServiceResult<Self> {
        Self::from_http(HttpClient::new(Self::with_microversion(config), auth)?)
    }

    /// Creates a client sharing an existing connection pool.
    pub fn with_client(
        client: reqwest::Client,
        config: ServiceConfig,
        auth: RequestAuth,
    ) -> ServiceResult<Self> {
        Self::from_http(HttpClient::with_client(
            client,
            Self::with_microversion(config),
            auth,
        )?)
    }

    fn with_microversion(mut config: ServiceConfig) -> ServiceConfig {
        if config.microversion.is_none() {
            config.microversion = Some(DEFAULT_PLACEMENT_MICROVERSION.to_string());
        }
        config
    }

    fn from_http(client: HttpClient) -> ServiceResult<Self> {
        info!("Placement client initialized for '{}'", client.base_url());
        Ok(Self { client })
    }

    fn provider_path(uuid: &str) -> String {
        format!("/resource_providers/{}", urlencoding::encode(uuid))
    }

    fn provider_subpath(uuid: &str, collection: &str) -> String {
        format!("{}/{}", Self::provider_path(uuid), collection)
    }
}

#[async_trait]
impl PlacementService for PlacementClient {
    #[instrument(skip(self))]
    async fn list_resource_providers(
        &self,
        opts: &ListOpts,
    ) -> ServiceResult<Vec<ResourceProvider>> {
        let list: ResourceProviderList = self
            .client
            .get_json_with_query("/resource_providers", &opts.to_query())
            .await?;
        Ok(list.resource_providers)
    }

    #[instrument(skip(self))]
    async fn create_resource_provider(&self, opts: &CreateOpts) -> ServiceResult<ResourceProvider> {
        self.client.post_json("/resource_providers", opts).await
    }

    #[instrument(skip(self))]
    async fn get_resource_provider(&self, uuid: &str) -> ServiceResult<ResourceProvider> {
        self.client.get_json(&Self::provider_path(uuid)).await
    }

    #[instrument(skip(self))]
    async fn update_resource_provider(
        &self,
        uuid: &str,
        opts: &UpdateOpts,
    ) -> ServiceResult<ResourceProvider> {
        self.client.put_json(&Self::provider_path(uuid), opts).await
    }

    #[instrument(skip(self))]
    async fn delete_resource_provider(&self, uuid: &str) -> ServiceResult<()> {
        self.client.delete(&Self::provider_path(uuid)).await
    }

    #[instrument(skip(self))]
    async fn get_usages(&self, uuid: &str) -> ServiceResult<ResourceProviderUsage> {
        self.client
            .get_json(&Self::provider_subpath(uuid, "usages"))
            .await
    }

    #[instrument(skip(self))]
    async fn get_inventories(&self, uuid: &str) -> ServiceResult<ResourceProviderInventories> {
        self.client
            .get_json(&Self::provider_subpath(uuid, "inventories"))
            .await
    }

    #[instrument(skip(self, opts), fields(generation = opts.resource_provider_generation))]
    async fn update_inventories(
        &self,
        uuid: &str,
        opts: &UpdateInventoriesOpts,
    ) -> ServiceResult<ResourceProviderInventories> {
        self.client
            .put_json(&Self::provider_subpath(uuid, "inventories"), opts)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_inventories(&self, uuid: &str) -> ServiceResult<()> {
        self.client
            .delete(&Self::provider_subpath(uuid, "inventories"))
            .await
    }

    #[instrument(skip(self))]
    async fn get_traits(&self, uuid: &str) -> ServiceResult<ResourceProviderTraits> {
        self.client
            .get_json(&Self::provider_subpath(uuid, "traits"))
            .await
    }

    #[instrument(skip(self, opts), fields(generation = opts.resource_provider_generation))]
    async fn update_traits(
        &self,
        uuid: &str,
        opts: &UpdateTraitsOpts,
    ) -> ServiceResult<ResourceProviderTraits> {
        self.client
            .put_json(&Self::provider_subpath(uuid, "traits"), opts)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_traits(&self, uuid: &str) -> ServiceResult<()> {
        self.client
            .delete(&Self::provider_subpath(uuid, "traits"))
            .await
    }
}
