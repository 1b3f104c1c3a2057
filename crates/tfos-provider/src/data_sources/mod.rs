//! Read-only data source handlers.

pub mod resource_provider;
pub mod resource_provider_inventory;
pub mod resource_provider_traits;
pub mod resource_provider_usages;
pub mod secret_acl;

pub use resource_provider::ResourceProviderDataSource;
pub use resource_provider_inventory::ResourceProviderInventoryDataSource;
pub use resource_provider_traits::ResourceProviderTraitsDataSource;
pub use resource_provider_usages::ResourceProviderUsagesDataSource;
pub use secret_acl::SecretAclDataSource;

use crate::registry::Provider;
use std::sync::Arc;

/// Registers every data source handler.
pub fn register_all(provider: &mut Provider) {
    provider.register_data_source(Arc::new(ResourceProviderDataSource));
    provider.register_data_source(Arc::new(ResourceProviderInventoryDataSource));
    provider.register_data_source(Arc::new(ResourceProviderTraitsDataSource));
    provider.register_data_source(Arc::new(ResourceProviderUsagesDataSource));
    provider.register_data_source(Arc::new(SecretAclDataSource));
}
