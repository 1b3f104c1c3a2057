//! End-to-end lifecycle tests against the in-memory service mocks.
//!
//! These tests drive the provider the way a host would: plan, create,
//! refresh, update, import and destroy, with data sources reading the
//! objects the resources manage.

use std::sync::Arc;

use serde_json::{json, Value};
use serial_test::serial;
use tfos_client::{MockClientFactory, PlacementService, ServiceError};
use tfos_provider::{Attributes, Config, PlanAction, Provider, ProviderError, ProviderSettings};

const RP: &str = "openstack_placement_resourceprovider_v1";
const INVENTORY: &str = "openstack_placement_resourceprovider_inventory_v1";
const TRAITS: &str = "openstack_placement_resourceprovider_traits_v1";
const USAGES: &str = "openstack_placement_resourceprovider_usages_v1";
const SECRET_ACL: &str = "openstack_keymanager_secret_acl_v1";

// =============================================================================
// Helpers
// =============================================================================

fn attrs(value: Value) -> Attributes {
    value.as_object().cloned().unwrap_or_default()
}

fn setup() -> (Provider, MockClientFactory) {
    let factory = MockClientFactory::new();
    let config = Config::new("RegionOne", Arc::new(factory.clone()));
    (Provider::openstack(config), factory)
}

// =============================================================================
// Placement
// =============================================================================

#[tokio::test]
async fn test_provider_tree_with_inventory_and_traits() {
    let (provider, factory) = setup();

    let plan = provider
        .plan_resource_change(RP, None, attrs(json!({"name": "compute-0"})))
        .unwrap();
    assert_eq!(plan.action, PlanAction::Create);

    let root = provider
        .create_resource(RP, attrs(json!({"name": "compute-0"})))
        .await
        .unwrap();
    let numa = provider
        .create_resource(
            RP,
            attrs(json!({"name": "compute-0-numa0", "parent_provider_uuid": root.id})),
        )
        .await
        .unwrap();
    assert_eq!(numa.attributes["root_provider_uuid"], json!(root.id));

    let inventory = provider
        .create_resource(
            INVENTORY,
            attrs(json!({
                "resource_provider_id": numa.id,
                "inventories": {
                    "VCPU": {"allocation_ratio": 4.0, "max_unit": 16, "total": 16},
                    "MEMORY_MB": {"allocation_ratio": 1.5, "max_unit": 65536, "total": 65536, "reserved": 512}
                }
            })),
        )
        .await
        .unwrap();
    assert_eq!(inventory.attributes["resource_provider_generation"], json!(1));

    let traits = provider
        .create_resource(
            TRAITS,
            attrs(json!({"resource_provider_id": numa.id, "traits": ["HW_NUMA_ROOT"]})),
        )
        .await
        .unwrap();
    assert_eq!(traits.attributes["resource_provider_generation"], json!(2));

    // The inventory state is now one generation behind; a refresh catches up.
    let refreshed = provider
        .read_resource(INVENTORY, &inventory)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.attributes["resource_provider_generation"], json!(2));

    factory.placement.set_usage(&numa.id, "VCPU", 3).await;
    let usages = provider
        .read_data_source(USAGES, attrs(json!({"resource_provider_id": numa.id})))
        .await
        .unwrap();
    assert_eq!(usages.attributes["usages"], json!({"MEMORY_MB": 0, "VCPU": 3}));

    let found = provider
        .read_data_source(
            RP,
            attrs(json!({"in_tree": root.id, "required": "HW_NUMA_ROOT"})),
        )
        .await
        .unwrap();
    assert_eq!(found.id, numa.id);

    let found = provider
        .read_data_source(RP, attrs(json!({"resources": "VCPU:8"})))
        .await
        .unwrap();
    assert_eq!(found.id, numa.id);

    // Destroy in dependency order.
    provider.delete_resource(TRAITS, &traits).await.unwrap();
    provider.delete_resource(INVENTORY, &refreshed).await.unwrap();
    assert!(matches!(
        provider.delete_resource(RP, &root).await,
        Err(ProviderError::Service { .. })
    ));
    provider.delete_resource(RP, &numa).await.unwrap();
    provider.delete_resource(RP, &root).await.unwrap();
    assert_eq!(factory.placement.provider_count().await, 0);
}

#[tokio::test]
async fn test_reparenting_moves_provider_under_new_root() {
    let (provider, factory) = setup();
    let a = factory.placement.add_provider("a").await;
    let b = factory.placement.add_provider("b").await;

    let child = provider
        .create_resource(RP, attrs(json!({"name": "child", "parent_provider_uuid": a})))
        .await
        .unwrap();

    let plan = provider
        .plan_resource_change(
            RP,
            Some(&child),
            attrs(json!({"name": "child", "parent_provider_uuid": b})),
        )
        .unwrap();
    assert_eq!(plan.action, PlanAction::Update);

    let moved = provider
        .update_resource(
            RP,
            &child,
            attrs(json!({"name": "child", "parent_provider_uuid": b})),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.attributes["parent_provider_uuid"], json!(b));
    assert_eq!(moved.attributes["root_provider_uuid"], json!(b));

    let remote = factory.placement.get_resource_provider(&child.id).await.unwrap();
    assert_eq!(remote.parent_provider_uuid.as_deref(), Some(b.as_str()));
}

#[tokio::test]
async fn test_drift_is_detected_on_refresh() {
    let (provider, factory) = setup();
    let state = provider
        .create_resource(RP, attrs(json!({"name": "rp"})))
        .await
        .unwrap();

    factory
        .placement
        .update_resource_provider(
            &state.id,
            &tfos_client::UpdateOpts {
                name: Some("renamed-outside".into()),
                parent_provider_uuid: None,
            },
        )
        .await
        .unwrap();

    let refreshed = provider.read_resource(RP, &state).await.unwrap().unwrap();
    assert_eq!(refreshed.attributes["name"], json!("renamed-outside"));

    let plan = provider
        .plan_resource_change(RP, Some(&refreshed), attrs(json!({"name": "rp"})))
        .unwrap();
    assert_eq!(plan.action, PlanAction::Update);
}

// =============================================================================
// Key Manager
// =============================================================================

#[tokio::test]
async fn test_secret_acl_lifecycle_with_data_source() {
    let (provider, factory) = setup();
    factory.key_manager.add_secret("secret-1").await;

    let state = provider
        .create_resource(
            SECRET_ACL,
            attrs(json!({
                "secret_id": "secret-1",
                "read": [{"project_access": false, "users": ["alice"]}]
            })),
        )
        .await
        .unwrap();

    let seen = provider
        .read_data_source(SECRET_ACL, attrs(json!({"secret_id": "secret-1"})))
        .await
        .unwrap();
    assert_eq!(seen.attributes["read"], state.attributes["read"]);

    let plan = provider
        .plan_resource_change(
            SECRET_ACL,
            Some(&state),
            attrs(json!({
                "secret_id": "secret-2",
                "read": [{"project_access": false, "users": ["alice"]}]
            })),
        )
        .unwrap();
    assert_eq!(plan.action, PlanAction::Replace);
    assert_eq!(plan.requires_replace, vec!["secret_id"]);

    provider.delete_resource(SECRET_ACL, &state).await.unwrap();
    let seen = provider
        .read_data_source(SECRET_ACL, attrs(json!({"secret_id": "secret-1"})))
        .await
        .unwrap();
    assert_eq!(seen.attributes["read"][0]["project_access"], json!(true));
    assert_eq!(seen.attributes["read"][0]["users"], json!([]));
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_unreachable_service_reports_client_error() {
    let factory = MockClientFactory::failing(ServiceError::EndpointNotFound(
        "placement in RegionTwo".into(),
    ));
    let provider = Provider::openstack(Config::new("RegionTwo", Arc::new(factory)));

    let err = provider
        .create_resource(RP, attrs(json!({"name": "rp"})))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Client { service: "placement", .. }));
}

#[test]
#[serial]
fn test_settings_from_environment() {
    std::env::set_var("OS_AUTH_URL", "https://keystone.example.com:5000/v3");
    std::env::set_var("OS_REGION_NAME", "RegionTwo");
    std::env::set_var("OS_TOKEN", "gAAAAAB-token");

    let mut settings = ProviderSettings::from_yaml_str("project_name: admin\n").unwrap();
    settings.apply_env();

    std::env::remove_var("OS_AUTH_URL");
    std::env::remove_var("OS_REGION_NAME");
    std::env::remove_var("OS_TOKEN");

    assert_eq!(settings.auth_url, "https://keystone.example.com:5000/v3");
    assert_eq!(settings.region, "RegionTwo");
    assert_eq!(settings.project_name, "admin");
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn test_yaml_settings_win_over_environment() {
    std::env::set_var("OS_REGION_NAME", "FromEnv");

    let mut settings = ProviderSettings::from_yaml_str(
        "auth_url: https://keystone.example.com/v3\nregion: FromFile\n",
    )
    .unwrap();
    settings.apply_env();

    std::env::remove_var("OS_REGION_NAME");

    assert_eq!(settings.region, "FromFile");
    assert!(settings.validate().is_err());
}
