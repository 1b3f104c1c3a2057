//! Managed resource handlers.

pub mod resource_provider;
pub mod resource_provider_inventory;
pub mod resource_provider_traits;
pub mod secret_acl;

pub use resource_provider::ResourceProviderResource;
pub use resource_provider_inventory::ResourceProviderInventoryResource;
pub use resource_provider_traits::ResourceProviderTraitsResource;
pub use secret_acl::SecretAclResource;

use crate::registry::Provider;
use std::sync::Arc;

/// Registers every resource handler.
pub fn register_all(provider: &mut Provider) {
    provider.register_resource(Arc::new(ResourceProviderResource));
    provider.register_resource(Arc::new(ResourceProviderInventoryResource));
    provider.register_resource(Arc::new(ResourceProviderTraitsResource));
    provider.register_resource(Arc::new(SecretAclResource));
}
