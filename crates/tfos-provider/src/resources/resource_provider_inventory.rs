//! `openstack_placement_resourceprovider_inventory_v1` resource.
//!
//! Manages the complete inventory set of one resource provider. Writes are
//! guarded by the provider generation, which is fetched right before each
//! write.

use crate::config::{get_region, Config};
use crate::error::{check_deleted, ProviderError, ProviderResult};
use crate::flatten::{expand_inventories, flatten_inventories};
use crate::registry::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueType};
use async_trait::async_trait;
use tfos_client::UpdateInventoriesOpts;
use tracing::{debug, instrument};

const TYPE_NAME: &str = "openstack_placement_resourceprovider_inventory_v1";

/// Schema of one inventory record.
pub(crate) fn inventory_block() -> Schema {
    Schema::new()
        .attribute("allocation_ratio", Attribute::required(ValueType::Float))
        .attribute("max_unit", Attribute::required(ValueType::Int))
        .attribute("min_unit", Attribute::optional(ValueType::Int).with_default(1))
        .attribute("reserved", Attribute::optional(ValueType::Int).with_default(0))
        .attribute("step_size", Attribute::optional(ValueType::Int).with_default(1))
        .attribute("total", Attribute::required(ValueType::Int))
}

/// Inventories of a resource provider, keyed by resource class.
pub struct ResourceProviderInventoryResource;

#[async_trait]
impl Resource for ResourceProviderInventoryResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute(
                "region",
                Attribute::optional(ValueType::String).with_computed().force_new(),
            )
            .attribute(
                "resource_provider_id",
                Attribute::required(ValueType::String).force_new(),
            )
            .attribute(
                "inventories",
                Attribute::required(ValueType::Map).block(inventory_block()),
            )
            .attribute(
                "resource_provider_generation",
                Attribute::computed(ValueType::Int),
            )
    }

    async fn create(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        self.update(d, config).await
    }

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let region = get_region(d, config);
        let client = config.placement_v1_client(&region).await?;

        let mut rp_id = d.get_string("resource_provider_id");
        if rp_id.is_empty() && !d.id().is_empty() {
            // Imported by provider id.
            rp_id = d.id().to_string();
            d.set("resource_provider_id", rp_id.clone());
        }

        let inventories = match client.get_inventories(&rp_id).await {
            Ok(inventories) => inventories,
            Err(e) => {
                return check_deleted(
                    d,
                    e,
                    "Error retrieving inventories for resource provider",
                )
            }
        };
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

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn update(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.placement_v1_client(&get_region(d, config)).await?;
        let rp_id = d.get_string("resource_provider_id");

        let rp = client.get_resource_provider(&rp_id).await.map_err(|e| {
            ProviderError::service(format!("Error getting resource provider {}", rp_id), e)
        })?;

        let opts = UpdateInventoriesOpts {
            resource_provider_generation: rp.generation,
            inventories: expand_inventories(d.get("inventories")),
        };
        debug!(
            "Updating inventories for resource provider {}: {:?}",
            rp_id, opts
        );

        client.update_inventories(&rp_id, &opts).await.map_err(|e| {
            ProviderError::service(
                format!("Error updating inventories for resource provider {}", rp_id),
                e,
            )
        })?;

        d.set_id(rp_id);
        self.read(d, config).await
    }

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn delete(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.placement_v1_client(&get_region(d, config)).await?;
        let rp_id = d.get_string("resource_provider_id");

        debug!("Deleting inventories for resource provider {}", rp_id);
        match client.delete_inventories(&rp_id).await {
            Ok(()) => Ok(()),
            Err(e) => check_deleted(d, e, "Error deleting inventories for resource provider"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Provider;
    use crate::resources::test_support::{attrs, mock_config};
    use serde_json::json;
    use tfos_client::{MockClientFactory, PlacementService, ServiceError};

    async fn setup() -> (Provider, MockClientFactory, String) {
        let (config, factory) = mock_config();
        let rp = factory.placement.add_provider("compute-0").await;
        (Provider::openstack(config), factory, rp)
    }

    fn vcpu_config(rp: &str, total: i64) -> serde_json::Value {
        json!({
            "resource_provider_id": rp,
            "inventories": {
                "VCPU": {"allocation_ratio": 16.0, "max_unit": 8, "total": total}
            }
        })
    }

    #[tokio::test]
    async fn test_total_beyond_i64_is_rejected() {
        let (provider, factory, rp) = setup().await;
        let err = provider
            .create_resource(
                TYPE_NAME,
                attrs(json!({
                    "resource_provider_id": rp,
                    "inventories": {"VCPU": {"total": u64::MAX}}
                })),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidConfig(_)));
        assert!(factory.placement.get_inventories(&rp).await.unwrap().inventories.is_empty());
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_tracks_generation() {
        let (provider, factory, rp) = setup().await;
        let state = provider
            .create_resource(TYPE_NAME, attrs(vcpu_config(&rp, 8)))
            .await
            .unwrap();

        assert_eq!(state.id, rp);
        assert_eq!(state.attributes["resource_provider_generation"], json!(1));
        let vcpu = &state.attributes["inventories"]["VCPU"];
        assert_eq!(vcpu["min_unit"], json!(1));
        assert_eq!(vcpu["reserved"], json!(0));
        assert_eq!(vcpu["step_size"], json!(1));

        let remote = factory.placement.get_inventories(&rp).await.unwrap();
        assert_eq!(remote.inventories["VCPU"].total, 8);
    }

    #[tokio::test]
    async fn test_update_uses_current_generation() {
        let (provider, factory, rp) = setup().await;
        let state = provider
            .create_resource(TYPE_NAME, attrs(vcpu_config(&rp, 8)))
            .await
            .unwrap();

        // Another writer moved the generation since our last read.
        factory.placement.bump_generation(&rp).await;

        let updated = provider
            .update_resource(TYPE_NAME, &state, attrs(vcpu_config(&rp, 16)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.attributes["inventories"]["VCPU"]["total"], json!(16));
        assert_eq!(updated.attributes["resource_provider_generation"], json!(3));
    }

    #[tokio::test]
    async fn test_generation_conflict_is_reported() {
        let (provider, factory, rp) = setup().await;
        factory
            .placement
            .fail_next(
                "update_inventories",
                ServiceError::Conflict("resource provider generation conflict".into()),
            )
            .await;

        let err = provider
            .create_resource(TYPE_NAME, attrs(vcpu_config(&rp, 8)))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Error updating inventories for resource provider {}: Conflict: resource provider generation conflict",
                rp
            )
        );
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let (provider, _, _) = setup().await;
        let err = provider
            .create_resource(TYPE_NAME, attrs(vcpu_config("missing", 8)))
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error getting resource provider missing: "));
    }

    #[tokio::test]
    async fn test_missing_required_inventory_field() {
        let (provider, _, rp) = setup().await;
        let err = provider
            .create_resource(
                TYPE_NAME,
                attrs(json!({
                    "resource_provider_id": rp,
                    "inventories": {"VCPU": {"allocation_ratio": 1.0, "max_unit": 8}}
                })),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("inventories.VCPU.total"));
    }

    #[tokio::test]
    async fn test_import_and_delete() {
        let (provider, factory, rp) = setup().await;
        provider
            .create_resource(TYPE_NAME, attrs(vcpu_config(&rp, 4)))
            .await
            .unwrap();

        let imported = provider.import_resource(TYPE_NAME, &rp).await.unwrap();
        assert_eq!(imported.attributes["resource_provider_id"], json!(rp));
        assert_eq!(imported.attributes["inventories"]["VCPU"]["total"], json!(4));

        provider.delete_resource(TYPE_NAME, &imported).await.unwrap();
        assert!(factory
            .placement
            .get_inventories(&rp)
            .await
            .unwrap()
            .inventories
            .is_empty());
    }

    #[tokio::test]
    async fn test_read_removes_state_when_provider_is_gone() {
        let (provider, factory, rp) = setup().await;
        let state = provider
            .create_resource(TYPE_NAME, attrs(vcpu_config(&rp, 4)))
            .await
            .unwrap();
        factory.placement.remove_provider(&rp).await;

        assert!(provider.read_resource(TYPE_NAME, &state).await.unwrap().is_none());
    }
}
