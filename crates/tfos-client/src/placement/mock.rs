//! In-memory Placement service for testing.
//!
//! Generations behave like the real service: every inventory or trait write
//! bumps the provider generation, and a write carrying a stale generation is
//! rejected with [`ServiceError::Conflict`].

use crate::traits::{
    CreateOpts, Inventory, Link, ListOpts, PlacementService, ResourceProvider,
    ResourceProviderInventories, ResourceProviderTraits, ResourceProviderUsage, ServiceError,
    ServiceResult, UpdateInventoriesOpts, UpdateOpts, UpdateTraitsOpts,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct ProviderRecord {
    provider: ResourceProvider,
    inventories: BTreeMap<String, Inventory>,
    traits: Vec<String>,
    usages: BTreeMap<String, i64>,
}

#[derive(Debug, Default)]
struct MockState {
    providers: BTreeMap<String, ProviderRecord>,
    failures: HashMap<String, ServiceError>,
    calls: Vec<String>,
}

impl MockState {
    fn record(&mut self, operation: &str) -> ServiceResult<()> {
        self.calls.push(operation.to_string());
        match self.failures.remove(operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn provider_mut(&mut self, uuid: &str) -> ServiceResult<&mut ProviderRecord> {
        self.providers
            .get_mut(uuid)
            .ok_or_else(|| not_found(uuid))
    }

    fn provider(&self, uuid: &str) -> ServiceResult<&ProviderRecord> {
        self.providers.get(uuid).ok_or_else(|| not_found(uuid))
    }
}

fn not_found(uuid: &str) -> ServiceError {
    ServiceError::NotFound(format!("No resource provider with uuid {} found", uuid))
}

fn check_generation(record: &ProviderRecord, generation: i64) -> ServiceResult<()> {
    if record.provider.generation != generation {
        return Err(ServiceError::Conflict(format!(
            "resource provider generation conflict: expected {}, got {}",
            record.provider.generation, generation
        )));
    }
    Ok(())
}

fn provider_links(uuid: &str) -> Vec<Link> {
    let base = format!("/resource_providers/{}", uuid);
    let mut links = vec![Link {
        href: base.clone(),
        rel: "self".to_string(),
    }];
    for rel in ["inventories", "usages", "aggregates", "traits", "allocations"] {
        links.push(Link {
            href: format!("{}/{}", base, rel),
            rel: rel.to_string(),
        });
    }
    links
}

/// Mock Placement service.
#[derive(Clone, Default)]
pub struct MockPlacementService {
    state: Arc<RwLock<MockState>>,
}

impl MockPlacementService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root provider and returns its UUID.
    pub async fn add_provider(&self, name: &str) -> String {
        let uuid = Uuid::new_v4().to_string();
        let mut state = self.state.write().await;
        state.providers.insert(
            uuid.clone(),
            ProviderRecord {
                provider: ResourceProvider {
                    uuid: uuid.clone(),
                    name: name.to_string(),
                    generation: 0,
                    parent_provider_uuid: None,
                    root_provider_uuid: Some(uuid.clone()),
                    links: provider_links(&uuid),
                },
                inventories: BTreeMap::new(),
                traits: Vec::new(),
                usages: BTreeMap::new(),
            },
        );
        uuid
    }

    /// Records consumption of a resource class on a provider.
    pub async fn set_usage(&self, uuid: &str, resource_class: &str, used: i64) {
        let mut state = self.state.write().await;
        if let Some(record) = state.providers.get_mut(uuid) {
            record.usages.insert(resource_class.to_string(), used);
        }
    }

    /// Simulates a concurrent writer bumping the generation.
    pub async fn bump_generation(&self, uuid: &str) {
        let mut state = self.state.write().await;
        if let Some(record) = state.providers.get_mut(uuid) {
            record.provider.generation += 1;
        }
    }

    /// Removes a provider behind the caller's back.
    pub async fn remove_provider(&self, uuid: &str) {
        self.state.write().await.providers.remove(uuid);
    }

    /// Makes the next call of `operation` fail with `error`.
    pub async fn fail_next(&self, operation: &str, error: ServiceError) {
        self.state
            .write()
            .await
            .failures
            .insert(operation.to_string(), error);
    }

    /// Operations called so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.state.read().await.calls.clone()
    }

    pub async fn provider_count(&self) -> usize {
        self.state.read().await.providers.len()
    }
}

#[async_trait]
impl PlacementService for MockPlacementService {
    async fn list_resource_providers(
        &self,
        opts: &ListOpts,
    ) -> ServiceResult<Vec<ResourceProvider>> {
        let mut state = self.state.write().await;
        state.record("list_resource_providers")?;

        let matches = |record: &ProviderRecord| -> bool {
            let rp = &record.provider;
            let name_ok = opts.name.as_deref().map_or(true, |n| n.is_empty() || n == rp.name);
            let uuid_ok = opts.uuid.as_deref().map_or(true, |u| u.is_empty() || u == rp.uuid);
            let tree_ok = opts
                .in_tree
                .as_deref()
                .map_or(true, |t| t.is_empty() || rp.root_provider_uuid.as_deref() == Some(t));
            let required_ok = opts.required.as_deref().map_or(true, |required| {
                required
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .all(|t| match t.strip_prefix('!') {
                        Some(forbidden) => !record.traits.iter().any(|x| x == forbidden),
                        None => record.traits.iter().any(|x| x == t),
                    })
            });
            let resources_ok = opts.resources.as_deref().map_or(true, |resources| {
                resources
                    .split(',')
                    .filter(|r| !r.is_empty())
                    .all(|r| match r.split_once(':') {
                        Some((class, amount)) => {
                            let amount: i64 = amount.trim().parse().unwrap_or(i64::MAX);
                            record.inventories.get(class.trim()).map_or(false, |inv| {
                                let used = record.usages.get(class.trim()).copied().unwrap_or(0);
                                let capacity = ((inv.total - inv.reserved) as f64
                                    * inv.allocation_ratio) as i64;
                                capacity - used >= amount && amount <= inv.max_unit
                            })
                        }
                        None => false,
                    })
            });
            name_ok && uuid_ok && tree_ok && required_ok && resources_ok
        };

        Ok(state
            .providers
            .values()
            .filter(|r| matches(r))
            .map(|r| r.provider.clone())
            .collect())
    }

    async fn create_resource_provider(&self, opts: &CreateOpts) -> ServiceResult<ResourceProvider> {
        let mut state = self.state.write().await;
        state.record("create_resource_provider")?;

        if state.providers.values().any(|r| r.provider.name == opts.name) {
            return Err(ServiceError::Conflict(format!(
                "Conflicting resource provider name: {} already exists",
                opts.name
            )));
        }
        let uuid = opts
            .uuid
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if state.providers.contains_key(&uuid) {
            return Err(ServiceError::Conflict(format!(
                "Conflicting resource provider uuid: {} already exists",
                uuid
            )));
        }
        let root = match &opts.parent_provider_uuid {
            Some(parent) => state
                .providers
                .get(parent)
                .and_then(|p| p.provider.root_provider_uuid.clone())
                .ok_or_else(|| {
                    ServiceError::InvalidRequest(format!(
                        "parent provider UUID cannot be found: {}",
                        parent
                    ))
                })?,
            None => uuid.clone(),
        };

        let provider = ResourceProvider {
            uuid: uuid.clone(),
            name: opts.name.clone(),
            generation: 0,
            parent_provider_uuid: opts.parent_provider_uuid.clone(),
            root_provider_uuid: Some(root),
            links: provider_links(&uuid),
        };
        state.providers.insert(
            uuid,
            ProviderRecord {
                provider: provider.clone(),
                inventories: BTreeMap::new(),
                traits: Vec::new(),
                usages: BTreeMap::new(),
            },
        );
        Ok(provider)
    }

    async fn get_resource_provider(&self, uuid: &str) -> ServiceResult<ResourceProvider> {
        let mut state = self.state.write().await;
        state.record("get_resource_provider")?;
        Ok(state.provider(uuid)?.provider.clone())
    }

    async fn update_resource_provider(
        &self,
        uuid: &str,
        opts: &UpdateOpts,
    ) -> ServiceResult<ResourceProvider> {
        let mut state = self.state.write().await;
        state.record("update_resource_provider")?;

        if let Some(name) = &opts.name {
            if state
                .providers
                .values()
                .any(|r| r.provider.name == *name && r.provider.uuid != uuid)
            {
                return Err(ServiceError::Conflict(format!(
                    "Conflicting resource provider name: {} already exists",
                    name
                )));
            }
        }
        let new_root = match &opts.parent_provider_uuid {
            Some(parent) if parent.is_empty() => {
                return Err(ServiceError::InvalidRequest(
                    "Unable to unset parent provider".to_string(),
                ))
            }
            Some(parent) => Some(
                state
                    .provider(parent)
                    .map_err(|_| {
                        ServiceError::InvalidRequest(format!(
                            "parent provider UUID cannot be found: {}",
                            parent
                        ))
                    })?
                    .provider
                    .root_provider_uuid
                    .clone(),
            ),
            _ => None,
        };

        let record = state.provider_mut(uuid)?;
        if let Some(name) = &opts.name {
            record.provider.name = name.clone();
        }
        if let Some(parent) = &opts.parent_provider_uuid {
            record.provider.parent_provider_uuid = Some(parent.clone());
            if let Some(root) = new_root {
                record.provider.root_provider_uuid = root;
            }
        }
        Ok(record.provider.clone())
    }

    async fn delete_resource_provider(&self, uuid: &str) -> ServiceResult<()> {
        let mut state = self.state.write().await;
        state.record("delete_resource_provider")?;
        state.provider(uuid)?;
        if state
            .providers
            .values()
            .any(|r| r.provider.parent_provider_uuid.as_deref() == Some(uuid))
        {
            return Err(ServiceError::Conflict(format!(
                "Unable to delete parent resource provider {}: It has child resource providers.",
                uuid
            )));
        }
        state.providers.remove(uuid);
        Ok(())
    }

    async fn get_usages(&self, uuid: &str) -> ServiceResult<ResourceProviderUsage> {
        let mut state = self.state.write().await;
        state.record("get_usages")?;
        let record = state.provider(uuid)?;
        let usages = record
            .inventories
            .keys()
            .map(|class| {
                (
                    class.clone(),
                    record.usages.get(class).copied().unwrap_or(0),
                )
            })
            .collect();
        Ok(ResourceProviderUsage {
            resource_provider_generation: record.provider.generation,
            usages,
        })
    }

    async fn get_inventories(&self, uuid: &str) -> ServiceResult<ResourceProviderInventories> {
        let mut state = self.state.write().await;
        state.record("get_inventories")?;
        let record = state.provider(uuid)?;
        Ok(ResourceProviderInventories {
            resource_provider_generation: record.provider.generation,
            inventories: record.inventories.clone(),
        })
    }

    async fn update_inventories(
        &self,
        uuid: &str,
        opts: &UpdateInventoriesOpts,
    ) -> ServiceResult<ResourceProviderInventories> {
        let mut state = self.state.write().await;
        state.record("update_inventories")?;
        let record = state.provider_mut(uuid)?;
        check_generation(record, opts.resource_provider_generation)?;

        for (class, inventory) in &opts.inventories {
            if inventory.min_unit > inventory.max_unit || inventory.step_size < 1 {
                return Err(ServiceError::InvalidRequest(format!(
                    "Unable to update inventory for resource provider {}: invalid {} inventory",
                    uuid, class
                )));
            }
        }

        record.inventories = opts.inventories.clone();
        record.provider.generation += 1;
        Ok(ResourceProviderInventories {
            resource_provider_generation: record.provider.generation,
            inventories: record.inventories.clone(),
        })
    }

    async fn delete_inventories(&self, uuid: &str) -> ServiceResult<()> {
        let mut state = self.state.write().await;
        state.record("delete_inventories")?;
        let record = state.provider_mut(uuid)?;
        record.inventories.clear();
        record.provider.generation += 1;
        Ok(())
    }

    async fn get_traits(&self, uuid: &str) -> ServiceResult<ResourceProviderTraits> {
        let mut state = self.state.write().await;
        state.record("get_traits")?;
        let record = state.provider(uuid)?;
        Ok(ResourceProviderTraits {
            resource_provider_generation: record.provider.generation,
            traits: record.traits.clone(),
        })
    }

    async fn update_traits(
        &self,
        uuid: &str,
        opts: &UpdateTraitsOpts,
    ) -> ServiceResult<ResourceProviderTraits> {
        let mut state = self.state.write().await;
        state.record("update_traits")?;
        let record = state.provider_mut(uuid)?;
        check_generation(record, opts.resource_provider_generation)?;

        let mut traits = opts.traits.clone();
        traits.sort();
        traits.dedup();
        record.traits = traits;
        record.provider.generation += 1;
        Ok(ResourceProviderTraits {
            resource_provider_generation: record.provider.generation,
            traits: record.traits.clone(),
        })
    }

    async fn delete_traits(&self, uuid: &str) -> ServiceResult<()> {
        let mut state = self.state.write().await;
        state.record("delete_traits")?;
        let record = state.provider_mut(uuid)?;
        record.traits.clear();
        record.provider.generation += 1;
        Ok(())
    }
}
