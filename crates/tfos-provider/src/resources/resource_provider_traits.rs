//! `openstack_placement_resourceprovider_traits_v1` resource.

use crate::config::{get_region, Config};
use crate::error::{check_deleted, ProviderError, ProviderResult};
use crate::registry::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueType};
use async_trait::async_trait;
use tfos_client::UpdateTraitsOpts;
use tracing::{debug, instrument};

const TYPE_NAME: &str = "openstack_placement_resourceprovider_traits_v1";

/// The trait set of a resource provider.
pub struct ResourceProviderTraitsResource;

#[async_trait]
impl Resource for ResourceProviderTraitsResource {
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
                "traits",
                Attribute::required(ValueType::Set).elem(ValueType::String),
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
            rp_id = d.id().to_string();
            d.set("resource_provider_id", rp_id.clone());
        }

        let traits = match client.get_traits(&rp_id).await {
            Ok(traits) => traits,
            Err(e) => {
                return check_deleted(d, e, "Error retrieving traits for resource provider")
            }
        };
        debug!("Retrieved traits for resource provider {}: {:?}", rp_id, traits);

        let mut names = traits.traits;
        names.sort();

        d.set_id(rp_id);
        d.set(
            "resource_provider_generation",
            traits.resource_provider_generation,
        );
        d.set("region", region);
        d.set("traits", names);
        Ok(())
    }

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn update(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.placement_v1_client(&get_region(d, config)).await?;
        let rp_id = d.get_string("resource_provider_id");

        let rp = client.get_resource_provider(&rp_id).await.map_err(|e| {
            ProviderError::service(format!("Error getting resource provider {}", rp_id), e)
        })?;

        let opts = UpdateTraitsOpts {
            resource_provider_generation: rp.generation,
            traits: d.get_string_set("traits"),
        };
        debug!("Updating traits for resource provider {}: {:?}", rp_id, opts);

        client.update_traits(&rp_id, &opts).await.map_err(|e| {
            ProviderError::service(
                format!("Error updating traits for resource provider {}", rp_id),
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

        debug!("Deleting traits for resource provider {}", rp_id);
        match client.delete_traits(&rp_id).await {
            Ok(()) => Ok(()),
            Err(e) => check_deleted(d, e, "Error deleting traits for resource provider"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{PlanAction, Provider};
    use crate::resources::test_support::{attrs, mock_config};
    use serde_json::json;
    use tfos_client::{MockClientFactory, PlacementService, ServiceError};

    async fn setup() -> (Provider, MockClientFactory, String) {
        let (config, factory) = mock_config();
        let rp = factory.placement.add_provider("compute-0").await;
        (Provider::openstack(config), factory, rp)
    }

    #[tokio::test]
    async fn test_create_sets_sorted_traits() {
        let (provider, factory, rp) = setup().await;
        let state = provider
            .create_resource(
                TYPE_NAME,
                attrs(json!({
                    "resource_provider_id": rp,
                    "traits": ["HW_CPU_X86_AVX2", "CUSTOM_GOLD", "CUSTOM_GOLD"]
                })),
            )
            .await
            .unwrap();

        assert_eq!(state.id, rp);
        assert_eq!(
            state.attributes["traits"],
            json!(["CUSTOM_GOLD", "HW_CPU_X86_AVX2"])
        );
        assert_eq!(state.attributes["resource_provider_generation"], json!(1));

        let remote = factory.placement.get_traits(&rp).await.unwrap();
        assert_eq!(remote.traits.len(), 2);
    }

    #[tokio::test]
    async fn test_reordered_traits_plan_no_change() {
        let (provider, _, rp) = setup().await;
        let state = provider
            .create_resource(
                TYPE_NAME,
                attrs(json!({"resource_provider_id": rp, "traits": ["B_TRAIT", "A_TRAIT"]})),
            )
            .await
            .unwrap();

        let plan = provider
            .plan_resource_change(
                TYPE_NAME,
                Some(&state),
                attrs(json!({"resource_provider_id": rp, "traits": ["A_TRAIT", "B_TRAIT"]})),
            )
            .unwrap();
        assert_eq!(plan.action, PlanAction::NoOp);
    }

    #[tokio::test]
    async fn test_update_replaces_trait_set() {
        let (provider, _, rp) = setup().await;
        let state = provider
            .create_resource(
                TYPE_NAME,
                attrs(json!({"resource_provider_id": rp, "traits": ["CUSTOM_A"]})),
            )
            .await
            .unwrap();
        let updated = provider
            .update_resource(
                TYPE_NAME,
                &state,
                attrs(json!({"resource_provider_id": rp, "traits": ["CUSTOM_B"]})),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.attributes["traits"], json!(["CUSTOM_B"]));
        assert_eq!(updated.attributes["resource_provider_generation"], json!(2));
    }

    #[tokio::test]
    async fn test_update_error_message() {
        let (provider, factory, rp) = setup().await;
        factory
            .placement
            .fail_next("update_traits", ServiceError::InvalidRequest("No such trait(s): BOGUS".into()))
            .await;
        let err = provider
            .create_resource(
                TYPE_NAME,
                attrs(json!({"resource_provider_id": rp, "traits": ["BOGUS"]})),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Error updating traits for resource provider {}: Invalid request: No such trait(s): BOGUS",
                rp
            )
        );
    }

    #[tokio::test]
    async fn test_import_then_delete() {
        let (provider, factory, rp) = setup().await;
        factory
            .placement
            .update_traits(
                &rp,
                &UpdateTraitsOpts {
                    resource_provider_generation: 0,
                    traits: vec!["CUSTOM_X".into()],
                },
            )
            .await
            .unwrap();

        let imported = provider.import_resource(TYPE_NAME, &rp).await.unwrap();
        assert_eq!(imported.attributes["traits"], json!(["CUSTOM_X"]));
        assert_eq!(imported.attributes["resource_provider_id"], json!(rp));

        provider.delete_resource(TYPE_NAME, &imported).await.unwrap();
        assert!(factory.placement.get_traits(&rp).await.unwrap().traits.is_empty());
    }

    #[tokio::test]
    async fn test_delete_of_vanished_provider_succeeds() {
        let (provider, factory, rp) = setup().await;
        let state = provider
            .create_resource(
                TYPE_NAME,
                attrs(json!({"resource_provider_id": rp, "traits": ["CUSTOM_A"]})),
            )
            .await
            .unwrap();
        factory.placement.remove_provider(&rp).await;
        assert!(provider.delete_resource(TYPE_NAME, &state).await.is_ok());
    }
}
