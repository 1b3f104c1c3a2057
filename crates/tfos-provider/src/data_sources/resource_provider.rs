//! `openstack_placement_resourceprovider_v1` data source.
//!
//! Looks a provider up by `uuid`, or lists providers with the given filters
//! and requires exactly one match.

use crate::config::{get_region, Config};
use crate::error::{ProviderError, ProviderResult};
use crate::flatten::flatten_links;
use crate::registry::DataSource;
use crate::resource_data::ResourceData;
use crate::resources::resource_provider::links_attribute;
use crate::schema::{Attribute, Schema, ValueType};
use async_trait::async_trait;
use serde_json::Value;
use tfos_client::{ListOpts, ResourceProvider};
use tracing::{debug, instrument};

const TYPE_NAME: &str = "openstack_placement_resourceprovider_v1";

pub struct ResourceProviderDataSource;

fn filter(d: &ResourceData, key: &str) -> Option<String> {
    d.get_ok(key).and_then(Value::as_str).map(String::from)
}

fn set_attributes(d: &mut ResourceData, config: &Config, rp: ResourceProvider) {
    debug!("Retrieved {}: {:?}", TYPE_NAME, rp);
    let region = get_region(d, config);

    d.set_id(rp.uuid.clone());
    d.set("uuid", rp.uuid);
    d.set("name", rp.name);
    d.set(
        "parent_provider_uuid",
        rp.parent_provider_uuid.unwrap_or_default(),
    );
    d.set("root_provider_uuid", rp.root_provider_uuid.unwrap_or_default());
    d.set("generation", rp.generation);
    d.set("region", region);
    d.set("links", flatten_links(&rp.links));
}

#[async_trait]
impl DataSource for ResourceProviderDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute("region", Attribute::optional(ValueType::String).with_computed())
            .attribute("name", Attribute::optional(ValueType::String))
            .attribute("uuid", Attribute::optional(ValueType::String).with_computed())
            .attribute("member_of", Attribute::optional(ValueType::String))
            .attribute("resources", Attribute::optional(ValueType::String))
            .attribute("in_tree", Attribute::optional(ValueType::String))
            .attribute("required", Attribute::optional(ValueType::String))
            .attribute("parent_provider_uuid", Attribute::computed(ValueType::String))
            .attribute("root_provider_uuid", Attribute::computed(ValueType::String))
            .attribute("generation", Attribute::computed(ValueType::Int))
            .attribute("links", links_attribute())
    }

    #[instrument(skip_all)]
    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.placement_v1_client(&get_region(d, config)).await?;

        if let Some(uuid) = filter(d, "uuid") {
            let rp = client.get_resource_provider(&uuid).await.map_err(|e| {
                ProviderError::service(format!("Error retrieving resource provider {}", uuid), e)
            })?;
            set_attributes(d, config, rp);
            return Ok(());
        }

        let opts = ListOpts {
            name: filter(d, "name"),
            uuid: None,
            member_of: filter(d, "member_of"),
            resources: filter(d, "resources"),
            in_tree: filter(d, "in_tree"),
            required: filter(d, "required"),
        };
        debug!("{} list options: {:?}", TYPE_NAME, opts);

        let mut providers = client
            .list_resource_providers(&opts)
            .await
            .map_err(|e| ProviderError::service("Unable to list resource providers", e))?;

        match providers.len() {
            0 => Err(ProviderError::Lookup(
                "No resource provider found matching criteria".into(),
            )),
            1 => {
                let rp = providers.remove(0);
                set_attributes(d, config, rp);
                Ok(())
            }
            n => Err(ProviderError::Lookup(format!(
                "More than one resource provider found ({})",
                n
            ))),
        }
    }
}
