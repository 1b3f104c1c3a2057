//! `openstack_keymanager_secret_acl_v1` data source.

use crate::config::{get_region, Config};
use crate::error::{ProviderError, ProviderResult};
use crate::flatten::flatten_acl_read;
use crate::registry::DataSource;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueType};
use async_trait::async_trait;
use tfos_client::ACL_TYPE_READ;
use tracing::{debug, instrument};

pub struct SecretAclDataSource;

#[async_trait]
impl DataSource for SecretAclDataSource {
    fn type_name(&self) -> &'static str {
        "openstack_keymanager_secret_acl_v1"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute("region", Attribute::optional(ValueType::String).with_computed())
            .attribute("secret_id", Attribute::required(ValueType::String))
            .attribute(
                "read",
                Attribute::computed(ValueType::List).block(
                    Schema::new()
                        .attribute("project_access", Attribute::computed(ValueType::Bool))
                        .attribute(
                            "users",
                            Attribute::computed(ValueType::Set).elem(ValueType::String),
                        )
                        .attribute("created", Attribute::computed(ValueType::String))
                        .attribute("updated", Attribute::computed(ValueType::String)),
                ),
            )
            // GET does not return the ACL reference, so this stays empty.
            .attribute("acl_ref", Attribute::computed(ValueType::String))
    }

    #[instrument(skip_all)]
    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()> {
        let region = get_region(d, config);
        let client = config.key_manager_v1_client(&region).await?;
        let secret_id = d.get_string("secret_id");

        let acl = client.get_secret_acl(&secret_id).await.map_err(|e| {
            ProviderError::service(format!("Error retrieving ACL for secret {}", secret_id), e)
        })?;
        debug!("Retrieved ACL for secret {}: {:?}", secret_id, acl);

        d.set_id(secret_id);
        if let Some(read) = acl.get(ACL_TYPE_READ) {
            d.set("read", flatten_acl_read(read));
        }
        d.set("region", region);
        Ok(())
    }
}
