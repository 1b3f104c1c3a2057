//! Data source command.

use anyhow::{Context, Result};
use std::path::Path;
use tfos_provider::{Provider, ResourceState};
use tracing::Instrument;

use super::{print_state, read_attributes, write_state, OutputFormat};

/// Reads a data source with the query in `file`.
pub async fn read(
    provider: &Provider,
    type_name: &str,
    file: &Path,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<ResourceState> {
    let config = read_attributes(file)?;
    let state = provider
        .read_data_source(type_name, config)
        .instrument(tfos_observability::operation_span!(type_name, "read"))
        .await
        .with_context(|| format!("Failed to read data source {}", type_name))?;

    if let Some(path) = out {
        write_state(path, &state)?;
    }
    print_state(type_name, &state, format)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tfos_client::MockClientFactory;
    use tfos_provider::Config;

    #[tokio::test]
    async fn test_read_usages() {
        let factory = MockClientFactory::new();
        let provider = Provider::openstack(Config::new("RegionOne", Arc::new(factory.clone())));
        let rp = factory.placement.add_provider("compute-0").await;

        let dir = tempfile::tempdir().unwrap();
        let query = dir.path().join("query.json");
        std::fs::write(&query, json!({"resource_provider_id": rp}).to_string()).unwrap();

        let state = read(
            &provider,
            "openstack_placement_resourceprovider_usages_v1",
            &query,
            None,
            OutputFormat::Text,
        )
        .await
        .unwrap();
        assert_eq!(state.id, rp);
        assert_eq!(state.attributes["usages"], json!({}));
    }

    #[tokio::test]
    async fn test_lookup_failure_has_context() {
        let factory = MockClientFactory::new();
        let provider = Provider::openstack(Config::new("RegionOne", Arc::new(factory)));

        let dir = tempfile::tempdir().unwrap();
        let query = dir.path().join("query.json");
        std::fs::write(&query, json!({"name": "missing"}).to_string()).unwrap();

        let err = read(
            &provider,
            "openstack_placement_resourceprovider_v1",
            &query,
            None,
            OutputFormat::Json,
        )
        .await
        .unwrap_err();
        assert_eq!(
            format!("{:#}", err),
            "Failed to read data source openstack_placement_resourceprovider_v1: No resource provider found matching criteria"
        );
    }
}
