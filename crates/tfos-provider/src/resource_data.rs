//! Per-invocation view of an object's attributes.

use crate::schema::{is_zero, values_equal, Attributes};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted state of one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Attribute accessor handed to resource and data source handlers.
///
/// Holds the prior state (empty on create) and the current values, which
/// start as the planned configuration and are overwritten by the handler.
/// Clearing the id marks the object as gone.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    prior: Attributes,
    values: Attributes,
}

impl ResourceData {
    pub fn new(id: impl Into<String>, prior: Attributes, values: Attributes) -> Self {
        Self {
            id: id.into(),
            prior,
            values,
        }
    }

    /// Data for an object about to be created.
    pub fn from_config(config: Attributes) -> Self {
        Self::new(String::new(), Attributes::new(), config)
    }

    /// Data for an object known from state.
    pub fn from_state(state: &ResourceState) -> Self {
        Self::new(
            state.id.clone(),
            state.attributes.clone(),
            state.attributes.clone(),
        )
    }

    /// Data holding only an id, as on import.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self::new(id, Attributes::new(), Attributes::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Current value of an attribute; null counts as unset.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Current value of an attribute when set to a non-zero value.
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !is_zero(v))
    }

    pub fn get_prior(&self, key: &str) -> Option<&Value> {
        self.prior.get(key).filter(|v| !v.is_null())
    }

    /// String value, empty when unset.
    pub fn get_string(&self, key: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn get_i64(&self, key: &str) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or_default()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or_default()
    }

    /// Set of strings, sorted and deduplicated.
    pub fn get_string_set(&self, key: &str) -> Vec<String> {
        let mut items: Vec<String> = self
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        items.sort();
        items.dedup();
        items
    }

    /// True when the current value differs from the prior state.
    pub fn has_change(&self, key: &str) -> bool {
        !values_equal(self.prior.get(key), self.values.get(key))
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn attributes(&self) -> &Attributes {
        &self.values
    }

    /// Final state, or `None` when the object is gone.
    pub fn into_state(self) -> Option<ResourceState> {
        if self.id.is_empty() {
            return None;
        }
        Some(ResourceState {
            id: self.id,
            attributes: self.values,
        })
    }
}
