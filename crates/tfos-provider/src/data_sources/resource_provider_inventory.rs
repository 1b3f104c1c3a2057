//! `openstack_placement_resourceprovider_inventory_v1` data source.

use crate::config::{get_region, Config};
use crate::error::{ProviderError, ProviderResult};
use crate::flatten::flatten_inventories;
use crate::registry::DataSource;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueType};
use async_trait::async_trait;
use tracing::{debug, instrument};

pub struct ResourceProviderInventoryDataSource;

fn computed_inventory_block() -> Schema {
    ["allocation_ratio", "max_unit", "min_unit", "reserved", "step_size", "total"]
        .into_iter()
        .fold(Schema::new(), |schema, name| {
            let value_type = if name == "allocation_ratio" {
                ValueType::Float
            } else {
                ValueType::Int
            };
            schema.attribute(name, Attribute::computed(value_type))
        })
}

#[async_trait]
impl DataSource for ResourceProviderInventoryDataSource {
    fn type_name(&self) -> &'static str {
        "openstack_placement_resourceprovider_inventory_v1"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute("region", Attribute::optional(ValueType::String).with_computed())
            .attribute("resource_provider_id", Attribute::required(ValueType::String))
            .attribute(
                "resource_provider_generation",
                Attribute::computed(ValueType::Int),
            )
            .attribute(
                "inventories",
                Attribute::computed(ValueType::Map).block(computed_inventory_block()),
            )
    }

    #[instrument(skip_all)]
    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let region = get_region(d, config);
        let client = config.placement_v1_client(&region).await?;
        let rp_id = d.get_string("resource_provider_id");

        let inventories = client.get_inventories(&rp_id).await.map_err(|e| {
            ProviderError::service(
                format!("Error retrieving inventories for resource provider {}", rp_id),
                e,
            )
        })?;
        debug!(
            "Retrieved inventories for resource provider {}: {:?}",
            rp_id, inventories
        );

        d.set_id(rp_id);
        d.set(
            "resource_provider_generation",
            inventories.resource_provider_generation,
        );
        d.set("region", region);
        d.set("inventories", flatten_inventories(&inventories.inventories));
        Ok(())
    }
}
