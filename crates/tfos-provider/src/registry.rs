//! Resource and data source registry.
//!
//! This module defines the handler traits and the [`Provider`] that routes
//! host operations (plan, create, read, update, delete, import and data
//! source reads) to the registered handlers.

use crate::config::Config;
use crate::error::{has_errors, Diagnostic, ProviderError, ProviderResult};
use crate::resource_data::{ResourceData, ResourceState};
use crate::schema::{Attributes, Schema};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A managed object type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name, e.g. `openstack_placement_resourceprovider_v1`.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn create(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()>;

    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()>;

    async fn update(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()>;

    async fn delete(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()>;

    /// Prepares an imported object for its first read. The id is passed
    /// through unchanged by default.
    async fn import(&self, _d: &mut ResourceData, _config: &Config) -> ProviderResult<()> {
        Ok(())
    }
}

/// A read-only lookup.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, d: &mut ResourceData, config: &Config) -> ProviderResult<()>;
}

/// Schemas of everything the provider serves.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    pub resources: BTreeMap<String, Schema>,
    pub data_sources: BTreeMap<String, Schema>,
}

/// What applying a plan will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Create,
    Update,
    Replace,
    NoOp,
}

/// Result of planning a change.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedChange {
    pub action: PlanAction,
    pub planned: Attributes,
    pub requires_replace: Vec<String>,
}

/// Handler registry plus runtime configuration.
pub struct Provider {
    resources: BTreeMap<String, Arc<dyn Resource>>,
    data_sources: BTreeMap<String, Arc<dyn DataSource>>,
    config: Config,
}

impl Provider {
    /// Creates an empty provider.
    pub fn new(config: Config) -> Self {
        Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
            config,
        }
    }

    /// Creates a provider with every OpenStack handler registered.
    pub fn openstack(config: Config) -> Self {
        let mut provider = Self::new(config);
        crate::resources::register_all(&mut provider);
        crate::data_sources::register_all(&mut provider);
        provider
    }

    pub fn register_resource(&mut self, resource: Arc<dyn Resource>) {
        let name = resource.type_name().to_string();
        info!("Registering resource: {}", name);
        self.resources.insert(name, resource);
    }

    pub fn register_data_source(&mut self, data_source: Arc<dyn DataSource>) {
        let name = data_source.type_name().to_string();
        info!("Registering data source: {}", name);
        self.data_sources.insert(name, data_source);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resource_types(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    pub fn data_source_types(&self) -> Vec<&str> {
        self.data_sources.keys().map(String::as_str).collect()
    }

    fn resource(&self, type_name: &str) -> ProviderResult<&Arc<dyn Resource>> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> ProviderResult<&Arc<dyn DataSource>> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownDataSourceType(type_name.to_string()))
    }

    /// Schemas of all registered handlers.
    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            resources: self
                .resources
                .iter()
                .map(|(name, r)| (name.clone(), r.schema()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, d)| (name.clone(), d.schema()))
                .collect(),
        }
    }

    /// Validates a resource configuration.
    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &Attributes,
    ) -> ProviderResult<Vec<Diagnostic>> {
        Ok(self.resource(type_name)?.schema().validate(config))
    }

    /// Validates a data source configuration.
    pub fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &Attributes,
    ) -> ProviderResult<Vec<Diagnostic>> {
        Ok(self.data_source(type_name)?.schema().validate(config))
    }

    /// Validates a configuration and turns it into planned values.
    fn prepare(schema: &Schema, config: Attributes) -> ProviderResult<Attributes> {
        let diagnostics = schema.validate(&config);
        if has_errors(&diagnostics) {
            let messages: Vec<String> = diagnostics
                .iter()
                .map(|d| match &d.attribute {
                    Some(attribute) => format!("{}: {}", attribute, d.summary),
                    None => d.summary.clone(),
                })
                .collect();
            return Err(ProviderError::InvalidConfig(messages.join("; ")));
        }
        let mut planned = config;
        schema.apply_defaults(&mut planned);
        schema.normalize(&mut planned);
        Ok(planned)
    }

    /// Plans the change from `prior` (absent for a new object) to `config`.
    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior: Option<&ResourceState>,
        config: Attributes,
    ) -> ProviderResult<PlannedChange> {
        let schema = self.resource(type_name)?.schema();
        let mut planned = Self::prepare(&schema, config)?;

        let Some(prior) = prior else {
            return Ok(PlannedChange {
                action: PlanAction::Create,
                planned,
                requires_replace: Vec::new(),
            });
        };

        schema.carry_computed(&prior.attributes, &mut planned);
        let requires_replace = schema.force_new_changes(&prior.attributes, &planned);
        let changed = !crate::schema::values_equal(
            Some(&serde_json::Value::Object(prior.attributes.clone())),
            Some(&serde_json::Value::Object(planned.clone())),
        );
        let action = if !requires_replace.is_empty() {
            PlanAction::Replace
        } else if changed {
            PlanAction::Update
        } else {
            PlanAction::NoOp
        };
        debug!(type_name, ?action, ?requires_replace, "Planned change");

        Ok(PlannedChange {
            action,
            planned,
            requires_replace,
        })
    }

    /// Creates an object and returns its state.
    #[instrument(skip(self, config))]
    pub async fn create_resource(
        &self,
        type_name: &str,
        config: Attributes,
    ) -> ProviderResult<ResourceState> {
        let resource = self.resource(type_name)?;
        let planned = Self::prepare(&resource.schema(), config)?;

        let mut d = ResourceData::from_config(planned);
        resource.create(&mut d, &self.config).await?;
        let id = d.id().to_string();
        d.into_state().ok_or_else(|| ProviderError::Vanished {
            resource_type: type_name.to_string(),
            id,
        })
    }

    /// Refreshes an object; `None` means it no longer exists.
    #[instrument(skip(self, state), fields(id = %state.id))]
    pub async fn read_resource(
        &self,
        type_name: &str,
        state: &ResourceState,
    ) -> ProviderResult<Option<ResourceState>> {
        let resource = self.resource(type_name)?;
        let mut d = ResourceData::from_state(state);
        resource.read(&mut d, &self.config).await?;
        Ok(d.into_state())
    }

    /// Updates an object in place.
    ///
    /// Fails with [`ProviderError::RequiresReplacement`] when a force-new
    /// attribute changed; the caller must delete and create instead.
    #[instrument(skip(self, prior, config), fields(id = %prior.id))]
    pub async fn update_resource(
        &self,
        type_name: &str,
        prior: &ResourceState,
        config: Attributes,
    ) -> ProviderResult<Option<ResourceState>> {
        let resource = self.resource(type_name)?;
        let schema = resource.schema();
        let mut planned = Self::prepare(&schema, config)?;
        schema.carry_computed(&prior.attributes, &mut planned);

        let requires_replace = schema.force_new_changes(&prior.attributes, &planned);
        if !requires_replace.is_empty() {
            return Err(ProviderError::RequiresReplacement(requires_replace));
        }

        let mut d = ResourceData::new(prior.id.clone(), prior.attributes.clone(), planned);
        resource.update(&mut d, &self.config).await?;
        Ok(d.into_state())
    }

    /// Deletes an object.
    #[instrument(skip(self, state), fields(id = %state.id))]
    pub async fn delete_resource(
        &self,
        type_name: &str,
        state: &ResourceState,
    ) -> ProviderResult<()> {
        let resource = self.resource(type_name)?;
        let mut d = ResourceData::from_state(state);
        resource.delete(&mut d, &self.config).await
    }

    /// Imports an existing object by id and reads it.
    #[instrument(skip(self))]
    pub async fn import_resource(
        &self,
        type_name: &str,
        id: &str,
    ) -> ProviderResult<ResourceState> {
        let resource = self.resource(type_name)?;
        let mut d = ResourceData::with_id(id);
        resource.import(&mut d, &self.config).await?;
        resource.read(&mut d, &self.config).await?;
        d.into_state().ok_or_else(|| ProviderError::Vanished {
            resource_type: type_name.to_string(),
            id: id.to_string(),
        })
    }

    /// Reads a data source.
    #[instrument(skip(self, config))]
    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: Attributes,
    ) -> ProviderResult<ResourceState> {
        let data_source = self.data_source(type_name)?;
        let planned = Self::prepare(&data_source.schema(), config)?;

        let mut d = ResourceData::from_config(planned);
        data_source.read(&mut d, &self.config).await?;
        let state = ResourceState {
            id: d.id().to_string(),
            attributes: d.attributes().clone(),
        };
        Ok(state)
    }
}
