//! # tfos-provider
//!
//! Resource and data source handlers for OpenStack Placement and Key
//! Manager.
//!
//! Handlers are registered on a [`Provider`], which validates
//! configurations against each handler's [`Schema`], plans changes, and
//! routes create, read, update, delete and import calls.

pub mod config;
pub mod data_sources;
pub mod error;
pub mod flatten;
pub mod registry;
pub mod resource_data;
pub mod resources;
pub mod schema;

pub use config::{Config, ProviderSettings};
pub use data_sources::{
    ResourceProviderDataSource, ResourceProviderInventoryDataSource,
    ResourceProviderTraitsDataSource, ResourceProviderUsagesDataSource, SecretAclDataSource,
};
pub use error::{Diagnostic, ProviderError, ProviderResult, Severity};
pub use registry::{DataSource, PlanAction, PlannedChange, Provider, ProviderSchema, Resource};
pub use resource_data::{ResourceData, ResourceState};
pub use resources::{
    ResourceProviderInventoryResource, ResourceProviderResource, ResourceProviderTraitsResource,
    SecretAclResource,
};
pub use schema::{Attribute, Attributes, Schema, ValueType};
