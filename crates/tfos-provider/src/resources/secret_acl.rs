//! `openstack_keymanager_secret_acl_v1` resource.

use crate::config::{get_region, Config};
use crate::error::{check_deleted, ProviderError, ProviderResult};
use crate::flatten::{expand_acl_read, flatten_acl_read};
use crate::registry::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueType};
use async_trait::async_trait;
use tfos_client::ACL_TYPE_READ;
use tracing::{debug, instrument};

const TYPE_NAME: &str = "openstack_keymanager_secret_acl_v1";

/// The `read` ACL of a Key Manager secret.
pub struct SecretAclResource;

#[async_trait]
impl Resource for SecretAclResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute(
                "region",
                Attribute::optional(ValueType::String).with_computed().force_new(),
            )
            .attribute("secret_id", Attribute::required(ValueType::String).force_new())
            .attribute(
                "read",
                Attribute::required(ValueType::List).max_items(1).block(
                    Schema::new()
                        .attribute(
                            "project_access",
                            Attribute::optional(ValueType::Bool).with_default(true),
                        )
                        .attribute(
                            "users",
                            Attribute::optional(ValueType::Set).elem(ValueType::String),
                        )
                        .attribute("created", Attribute::computed(ValueType::String))
                        .attribute("updated", Attribute::computed(ValueType::String)),
                ),
            )
            .attribute("acl_ref", Attribute::computed(ValueType::String))
    }

    #[instrument(skip_all)]
    async fn create(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.key_manager_v1_client(&get_region(d, config)).await?;

        let secret_id = d.get_string("secret_id");
        let opts = expand_acl_read(d.get("read"));
        debug!("{} create options: {:?}", TYPE_NAME, opts);

        let acl_ref = client
            .set_secret_acl(&secret_id, &opts)
            .await
            .map_err(|e| ProviderError::service("Error creating secret ACL", e))?;

        d.set_id(secret_id);
        d.set("acl_ref", acl_ref.acl_ref);
        self.read(d, config).await
    }

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let region = get_region(d, config);
        let client = config.key_manager_v1_client(&region).await?;

        let mut secret_id = d.get_string("secret_id");
        if secret_id.is_empty() && !d.id().is_empty() {
            // Imported by secret id.
            secret_id = d.id().to_string();
            d.set("secret_id", secret_id.clone());
        }

        let acl = match client.get_secret_acl(&secret_id).await {
            Ok(acl) => acl,
            Err(e) => return check_deleted(d, e, "Error retrieving secret ACL"),
        };
        debug!("Retrieved secret ACL: {:?}", acl);

        if let Some(read) = acl.get(ACL_TYPE_READ) {
            d.set("read", flatten_acl_read(read));
        }
        d.set("region", region);
        Ok(())
    }

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn update(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.key_manager_v1_client(&get_region(d, config)).await?;
        let secret_id = d.get_string("secret_id");

        // Compare what would be sent; created/updated are server-side.
        let opts = expand_acl_read(d.get("read"));
        if opts != expand_acl_read(d.get_prior("read")) {
            debug!("{} update options: {:?}", TYPE_NAME, opts);

            let acl_ref = client
                .update_secret_acl(&secret_id, &opts)
                .await
                .map_err(|e| ProviderError::service("Error updating secret ACL", e))?;
            d.set("acl_ref", acl_ref.acl_ref);
        }

        self.read(d, config).await
    }

    #[instrument(skip_all, fields(id = %d.id()))]
    async fn delete(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let client = config.key_manager_v1_client(&get_region(d, config)).await?;
        let secret_id = d.get_string("secret_id");

        debug!("Deleting secret ACL for secret {}", secret_id);
        match client.delete_secret_acl(&secret_id).await {
            Ok(()) => Ok(()),
            Err(e) => check_deleted(d, e, "Error deleting secret ACL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{PlanAction, Provider};
    use crate::resources::test_support::{attrs, mock_config};
    use serde_json::json;
    use tfos_client::{KeyManagerService, MockClientFactory, ServiceError};

    const SECRET: &str = "8a1d4c7e-2b3f-4e5a-9c6d-7e8f9a0b1c2d";

    async fn setup() -> (Provider, MockClientFactory) {
        let (config, factory) = mock_config();
        factory.key_manager.add_secret(SECRET).await;
        (Provider::openstack(config), factory)
    }

    fn acl_config(project_access: bool, users: &[&str]) -> serde_json::Value {
        json!({
            "secret_id": SECRET,
            "read": [{"project_access": project_access, "users": users}]
        })
    }

    #[tokio::test]
    async fn test_create_restricts_access() {
        let (provider, factory) = setup().await;
        let state = provider
            .create_resource(TYPE_NAME, attrs(acl_config(false, &["user-b", "user-a"])))
            .await
            .unwrap();

        assert_eq!(state.id, SECRET);
        assert_eq!(
            state.attributes["acl_ref"],
            json!(format!("http://barbican.mock:9311/v1/secrets/{}/acl", SECRET))
        );
        let read = &state.attributes["read"][0];
        assert_eq!(read["project_access"], json!(false));
        assert_eq!(read["users"], json!(["user-a", "user-b"]));
        assert_eq!(read["created"].as_str().unwrap().len(), 19);

        let remote = factory.key_manager.get_secret_acl(SECRET).await.unwrap();
        assert!(!remote["read"].project_access);
    }

    #[tokio::test]
    async fn test_project_access_defaults_to_true() {
        let (provider, _) = setup().await;
        let state = provider
            .create_resource(
                TYPE_NAME,
                attrs(json!({"secret_id": SECRET, "read": [{"users": ["u1"]}]})),
            )
            .await
            .unwrap();
        assert_eq!(state.attributes["read"][0]["project_access"], json!(true));
    }

    #[tokio::test]
    async fn test_read_block_requires_at_most_one_item() {
        let (provider, _) = setup().await;
        let err = provider
            .create_resource(
                TYPE_NAME,
                attrs(json!({"secret_id": SECRET, "read": [{}, {}]})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_unchanged_read_block_skips_patch() {
        let (provider, factory) = setup().await;
        let state = provider
            .create_resource(TYPE_NAME, attrs(acl_config(false, &["u1"])))
            .await
            .unwrap();

        let plan = provider
            .plan_resource_change(TYPE_NAME, Some(&state), attrs(acl_config(false, &["u1"])))
            .unwrap();
        assert_eq!(plan.action, PlanAction::NoOp);

        provider
            .update_resource(TYPE_NAME, &state, attrs(acl_config(false, &["u1"])))
            .await
            .unwrap();
        assert!(!factory
            .key_manager
            .calls()
            .await
            .contains(&"update_secret_acl".to_string()));
    }

    #[tokio::test]
    async fn test_users_containing_spaces_settle() {
        let (provider, _) = setup().await;
        let state = provider
            .create_resource(TYPE_NAME, attrs(acl_config(false, &["a", "a b"])))
            .await
            .unwrap();
        assert_eq!(state.attributes["read"][0]["users"], json!(["a", "a b"]));

        let plan = provider
            .plan_resource_change(TYPE_NAME, Some(&state), attrs(acl_config(false, &["a b", "a"])))
            .unwrap();
        assert_eq!(plan.planned["read"][0]["users"], json!(["a", "a b"]));
        assert_eq!(plan.action, PlanAction::NoOp);
    }

    #[tokio::test]
    async fn test_update_patches_users() {
        let (provider, factory) = setup().await;
        let state = provider
            .create_resource(TYPE_NAME, attrs(acl_config(false, &["u1"])))
            .await
            .unwrap();

        let updated = provider
            .update_resource(TYPE_NAME, &state, attrs(acl_config(false, &["u1", "u2"])))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.attributes["read"][0]["users"], json!(["u1", "u2"]));
        assert!(factory
            .key_manager
            .calls()
            .await
            .contains(&"update_secret_acl".to_string()));
    }

    #[tokio::test]
    async fn test_create_error_message() {
        let (provider, factory) = setup().await;
        factory
            .key_manager
            .fail_next(
                "set_secret_acl",
                ServiceError::AuthorizationDenied("not the secret owner".into()),
            )
            .await;
        let err = provider
            .create_resource(TYPE_NAME, attrs(acl_config(true, &[])))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error creating secret ACL: Authorization denied: not the secret owner"
        );
    }

    #[tokio::test]
    async fn test_import_by_secret_id() {
        let (provider, _) = setup().await;
        let state = provider.import_resource(TYPE_NAME, SECRET).await.unwrap();
        assert_eq!(state.attributes["secret_id"], json!(SECRET));
        assert_eq!(state.attributes["read"][0]["project_access"], json!(true));
        assert_eq!(state.attributes["read"][0]["created"], json!(""));
    }

    #[tokio::test]
    async fn test_delete_restores_default_and_tolerates_missing_secret() {
        let (provider, factory) = setup().await;
        let state = provider
            .create_resource(TYPE_NAME, attrs(acl_config(false, &["u1"])))
            .await
            .unwrap();
        provider.delete_resource(TYPE_NAME, &state).await.unwrap();
        let remote = factory.key_manager.get_secret_acl(SECRET).await.unwrap();
        assert!(remote["read"].project_access);

        factory.key_manager.remove_secret(SECRET).await;
        assert!(provider.delete_resource(TYPE_NAME, &state).await.is_ok());
        assert!(provider.read_resource(TYPE_NAME, &state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_client_failure() {
        let factory = MockClientFactory::failing(ServiceError::EndpointNotFound(
            "key-manager".into(),
        ));
        let provider = Provider::openstack(crate::config::Config::new(
            "RegionOne",
            std::sync::Arc::new(factory),
        ));
        let err = provider
            .create_resource(TYPE_NAME, attrs(acl_config(true, &[])))
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error creating OpenStack KeyManager client: "));
    }
}
