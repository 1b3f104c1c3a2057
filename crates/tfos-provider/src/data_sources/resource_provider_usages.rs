//! `openstack_placement_resourceprovider_usages_v1` data source.

use crate::config::{get_region, Config};
use crate::error::{ProviderError, ProviderResult};
use crate::flatten::flatten_usages;
use crate::registry::DataSource;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueType};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Consumed amounts per resource class.
pub struct ResourceProviderUsagesDataSource;

#[async_trait]
impl DataSource for ResourceProviderUsagesDataSource {
    fn type_name(&self) -> &'static str {
        "openstack_placement_resourceprovider_usages_v1"
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
                "usages",
                Attribute::computed(ValueType::Map).elem(ValueType::Int),
            )
    }

    #[instrument(skip_all)]
    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let region = get_region(d, config);
        let client = config.placement_v1_client(&region).await?;
        let rp_id = d.get_string("resource_provider_id");

        let usages = client.get_usages(&rp_id).await.map_err(|e| {
            ProviderError::service(
                format!("Error retrieving usages for resource provider {}", rp_id),
                e,
            )
        })?;
        debug!("Retrieved usages for resource provider {}: {:?}", rp_id, usages);

        d.set_id(rp_id);
        d.set(
            "resource_provider_generation",
            usages.resource_provider_generation,
        );
        d.set("region", region);
        d.set("usages", flatten_usages(&usages.usages));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Provider;
    use crate::resources::test_support::{attrs, mock_config};
    use serde_json::json;
    use std::collections::BTreeMap;
    use tfos_client::testing::sample_inventory;
    use tfos_client::{PlacementService, UpdateInventoriesOpts};

    const TYPE_NAME: &str = "openstack_placement_resourceprovider_usages_v1";

    #[tokio::test]
    async fn test_reads_usages_with_zero_for_unused_classes() {
        let (config, factory) = mock_config();
        let provider = Provider::openstack(config);
        let rp = factory.placement.add_provider("compute-0").await;
        let mut inventories = BTreeMap::new();
        inventories.insert("VCPU".to_string(), sample_inventory(16));
        inventories.insert("DISK_GB".to_string(), sample_inventory(100));
        factory
            .placement
            .update_inventories(
                &rp,
                &UpdateInventoriesOpts {
                    resource_provider_generation: 0,
                    inventories,
                },
            )
            .await
            .unwrap();
        factory.placement.set_usage(&rp, "VCPU", 6).await;

        let state = provider
            .read_data_source(TYPE_NAME, attrs(json!({"resource_provider_id": rp})))
            .await
            .unwrap();
        assert_eq!(state.attributes["usages"], json!({"DISK_GB": 0, "VCPU": 6}));
        assert_eq!(state.attributes["resource_provider_generation"], json!(1));
    }

    #[tokio::test]
    async fn test_error_names_provider() {
        let (config, _) = mock_config();
        let provider = Provider::openstack(config);
        let err = provider
            .read_data_source(TYPE_NAME, attrs(json!({"resource_provider_id": "gone"})))
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error retrieving usages for resource provider gone: "));
    }
}
