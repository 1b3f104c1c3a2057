//! # tfos-client
//!
//! OpenStack service clients used by the provider: Keystone authentication
//! and catalog lookup, Placement v1 and Key Manager v1.
//!
//! Each service is described by a trait with an HTTP implementation and an
//! in-memory mock, and clients are obtained per region through a
//! [`ClientFactory`].

pub mod factory;
pub mod http;
pub mod identity;
pub mod keymanager;
pub mod placement;
pub mod secure_string;
pub mod testing;
pub mod traits;

pub use factory::{
    ClientFactory, ClientOptions, MockClientFactory, OpenStackClientFactory,
    KEY_MANAGER_SERVICE_TYPE, PLACEMENT_SERVICE_TYPE,
};
pub use http::{HttpClient, RequestAuth};
pub use identity::{Catalog, Credentials, IdentityConfig, Interface, ProjectScope, Session};
pub use keymanager::{KeyManagerClient, MockKeyManagerService};
pub use placement::{MockPlacementService, PlacementClient, DEFAULT_PLACEMENT_MICROVERSION};
pub use secure_string::SecureString;
pub use traits::{
    acl_timestamp, AclDetails, AclRef, AclSetOpt, AclSetOpts, CreateOpts, Inventory,
    KeyManagerService, Link, ListOpts, PlacementService, ResourceProvider,
    ResourceProviderInventories, ResourceProviderTraits, ResourceProviderUsage, SecretAcl,
    ServiceConfig, ServiceError, ServiceResult, UpdateInventoriesOpts, UpdateOpts,
    UpdateTraitsOpts, ACL_TYPE_READ,
};
