//! `openstack_placement_resourceprovider_traits_v1` data source.

use crate::config::{get_region, Config};
use crate::error::{ProviderError, ProviderResult};
use crate::registry::DataSource;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueType};
use async_trait::async_trait;
use tracing::{debug, instrument};

pub struct ResourceProviderTraitsDataSource;

#[async_trait]
impl DataSource for ResourceProviderTraitsDataSource {
    fn type_name(&self) -> &'static str {
        "openstack_placement_resourceprovider_traits_v1"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute("region", Attribute::optional(ValueType::String).with_computed())
            .attribute("resource_provider_id", Attribute::required(ValueType::String))
            .attribute(
                "traits",
                Attribute::computed(ValueType::Set).elem(ValueType::String),
            )
            .attribute(
                "resource_provider_generation",
                Attribute::computed(ValueType::Int),
            )
    }

    #[instrument(skip_all)]
    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let region = get_region(d, config);
        let client = config.placement_v1_client(&region).await?;
        let rp_id = d.get_string("resource_provider_id");

        let traits = client.get_traits(&rp_id).await.map_err(|e| {
            ProviderError::service(
                format!("Error retrieving traits for resource provider {}", rp_id),
                e,
            )
        })?;
        debug!("Retrieved traits for resource provider {}: {:?}", rp_id, traits);

        let mut names = traits.traits;
        names.sort();

        d.set_id(rp_id);
        d.set("traits", names);
        d.set(
            "resource_provider_generation",
            traits.resource_provider_generation,
        );
        d.set("region", region);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Provider;
    use crate::resources::test_support::{attrs, mock_config};
    use serde_json::json;
    use tfos_client::{PlacementService, UpdateTraitsOpts};

    #[tokio::test]
    async fn test_reads_sorted_traits() {
        let (config, factory) = mock_config();
        let provider = Provider::openstack(config);
        let rp = factory.placement.add_provider("compute-0").await;
        factory
            .placement
            .update_traits(
                &rp,
                &UpdateTraitsOpts {
                    resource_provider_generation: 0,
                    traits: vec!["HW_CPU_X86_SSE".into(), "COMPUTE_STATUS_DISABLED".into()],
                },
            )
            .await
            .unwrap();

        let state = provider
            .read_data_source(
                "openstack_placement_resourceprovider_traits_v1",
                attrs(json!({"resource_provider_id": rp})),
            )
            .await
            .unwrap();
        assert_eq!(
            state.attributes["traits"],
            json!(["COMPUTE_STATUS_DISABLED", "HW_CPU_X86_SSE"])
        );
        assert_eq!(state.attributes["resource_provider_generation"], json!(1));
    }

    #[tokio::test]
    async fn test_requires_provider_id() {
        let (config, _) = mock_config();
        let provider = Provider::openstack(config);
        let err = provider
            .read_data_source(
                "openstack_placement_resourceprovider_traits_v1",
                attrs(json!({})),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("resource_provider_id"));
    }
}
