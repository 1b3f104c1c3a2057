//! `openstack_placement_resourceprovider_v1` resource.

use crate::config::{get_region, Config};
use crate::error::{check_deleted, ProviderError, ProviderResult};
use crate::flatten::flatten_links;
use crate::registry::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueType};
use async_trait::async_trait;
use serde_json::Value;
use tfos_client::{CreateOpts, UpdateOpts};
use tracing::{debug, instrument};

const TYPE_NAME: &str = "openstack_placement_resourceprovider_v1";

/// Computed `links` list of `{href, rel}` blocks.
pub(crate) fn links_attribute() -> Attribute {
    Attribute::computed(ValueType::List).block(
        Schema::new()
            .attribute("href", Attribute::computed(ValueType::String))
            .attribute("rel", Attribute::computed(ValueType::String)),
    )
}

fn optional_string(d: &ResourceData, key: &str) -> Option<String> {
    d.get_ok(key).and_then(Value::as_str).map(String::from)
}

/// A Placement resource provider.
pub struct ResourceProviderResource;

#[async_trait]
impl Resource for ResourceProviderResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute(
                "region",
                Attribute::optional(ValueType::String).with_computed().force_new(),
            )
            .attribute("name", Attribute::required(ValueType::String))
            .attribute(
                "uuid",
                Attribute::optional(ValueType::String).with_computed().force_new(),
            )
            .attribute("parent_provider_uuid", Attribute::optional(ValueType::String))
            .attribute("generation", Attribute::computed(ValueType::Int))
            .attribute("root_provider_uuid", Attribute::computed(ValueType::String))
            .attribute("links", links_attribute())
    }

    #[instrument(skip_all)]
    async fn create(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.placement_v1_client(&get_region(d, config)).await?;

        let opts = CreateOpts {
            name: d.get_string("name"),
            uuid: optional_string(d, "uuid"),
            parent_provider_uuid: optional_string(d, "parent_provider_uuid"),
        };
        debug!("{} create options: {:?}", TYPE_NAME, opts);

        let rp = client
            .create_resource_provider(&opts)
            .await
            .map_err(|e| ProviderError::service(format!("Unable to create {}", TYPE_NAME), e))?;

        d.set_id(rp.uuid);
        self.read(d, config).await
    }

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let region = get_region(d, config);
        let client = config.placement_v1_client(&region).await?;

        let rp = match client.get_resource_provider(d.id()).await {
            Ok(rp) => rp,
            Err(e) => return check_deleted(d, e, &format!("Error retrieving {}", TYPE_NAME)),
        };
        debug!("Retrieved {} {}: {:?}", TYPE_NAME, d.id(), rp);

        d.set("name", rp.name);
        d.set("uuid", rp.uuid);
        d.set(
            "parent_provider_uuid",
            rp.parent_provider_uuid.unwrap_or_default(),
        );
        d.set("root_provider_uuid", rp.root_provider_uuid.unwrap_or_default());
        d.set("generation", rp.generation);
        d.set("region", region);
        d.set("links", flatten_links(&rp.links));
        Ok(())
    }

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn update(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.placement_v1_client(&get_region(d, config)).await?;

        // PUT replaces the provider, so the name is always sent.
        if d.has_change("name") || d.has_change("parent_provider_uuid") {
            let mut opts = UpdateOpts {
                name: Some(d.get_string("name")),
                parent_provider_uuid: None,
            };
            if d.has_change("parent_provider_uuid") {
                opts.parent_provider_uuid = Some(d.get_string("parent_provider_uuid"));
            }
            debug!("{} {} update options: {:?}", TYPE_NAME, d.id(), opts);

            client
                .update_resource_provider(d.id(), &opts)
                .await
                .map_err(|e| {
                    ProviderError::service(format!("Error updating {} {}", TYPE_NAME, d.id()), e)
                })?;
        }

        self.read(d, config).await
    }

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn delete(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.placement_v1_client(&get_region(d, config)).await?;

        debug!("Deleting {} {}", TYPE_NAME, d.id());
        match client.delete_resource_provider(d.id()).await {
            Ok(()) => Ok(()),
            Err(e) => check_deleted(d, e, &format!("Error deleting {}", TYPE_NAME)),
        }
    }
}
