//! Attribute schemas for resources and data sources.
//!
//! A [`Schema`] declares the attributes of an object: their value type,
//! whether the user must, may or cannot set them, defaults, and whether a
//! change forces the object to be replaced. Configurations and states are
//! plain JSON objects ([`Attributes`]); the schema validates them, fills in
//! defaults and canonicalizes sets.

use crate::error::Diagnostic;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Attribute values of a configuration or state.
pub type Attributes = serde_json::Map<String, Value>;

/// The value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
    List,
    Set,
    Map,
}

impl ValueType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Int => value.is_i64(),
            ValueType::Float => value.is_number(),
            ValueType::Bool => value.is_boolean(),
            ValueType::List | ValueType::Set => value.is_array(),
            ValueType::Map => value.is_object(),
        }
    }
}

/// Element type of a collection attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Elem {
    /// Scalar elements.
    Type(ValueType),
    /// Nested blocks.
    Block(Schema),
}

/// Declaration of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elem: Option<Elem>,
}

impl Attribute {
    fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            default: None,
            max_items: None,
            elem: None,
        }
    }

    /// An attribute the user must set.
    pub fn required(value_type: ValueType) -> Self {
        Self {
            required: true,
            ..Self::new(value_type)
        }
    }

    /// An attribute the user may set.
    pub fn optional(value_type: ValueType) -> Self {
        Self {
            optional: true,
            ..Self::new(value_type)
        }
    }

    /// An attribute only the provider sets.
    pub fn computed(value_type: ValueType) -> Self {
        Self {
            computed: true,
            ..Self::new(value_type)
        }
    }

    /// Marks an optional attribute as filled in by the provider when unset.
    pub fn with_computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Scalar element type of a list, set or map.
    pub fn elem(mut self, value_type: ValueType) -> Self {
        self.elem = Some(Elem::Type(value_type));
        self
    }

    /// Nested block element of a list, set or map.
    pub fn block(mut self, schema: Schema) -> Self {
        self.elem = Some(Elem::Block(schema));
        self
    }

    /// True for attributes the user cannot set.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }

    fn nested_schema(&self) -> Option<&Schema> {
        match &self.elem {
            Some(Elem::Block(schema)) => Some(schema),
            _ => None,
        }
    }
}

/// The attributes of a resource, data source or nested block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute.
    pub fn attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Validates a configuration, returning one diagnostic per problem.
    pub fn validate(&self, config: &Attributes) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.validate_at(config, "", &mut diagnostics);
        diagnostics
    }

    fn validate_at(&self, config: &Attributes, prefix: &str, diags: &mut Vec<Diagnostic>) {
        for (name, value) in config {
            let path = join_path(prefix, name);
            let Some(attribute) = self.attributes.get(name) else {
                diags.push(Diagnostic::error(format!("Unsupported argument \"{}\"", name)).at(path));
                continue;
            };
            if value.is_null() {
                continue;
            }
            if attribute.is_computed_only() {
                diags.push(
                    Diagnostic::error(format!(
                        "\"{}\" is computed and cannot be set in configuration",
                        name
                    ))
                    .at(path),
                );
                continue;
            }
            check_value(attribute, value, &path, diags);
        }

        for (name, attribute) in &self.attributes {
            if attribute.required && is_unset(config.get(name)) {
                diags.push(
                    Diagnostic::error(format!("The argument \"{}\" is required", name))
                        .at(join_path(prefix, name)),
                );
            }
        }
    }

    /// Fills in defaults for unset attributes, including inside nested blocks.
    pub fn apply_defaults(&self, config: &mut Attributes) {
        for (name, attribute) in &self.attributes {
            if let Some(default) = &attribute.default {
                if config.get(name).map_or(true, Value::is_null) {
                    config.insert(name.clone(), default.clone());
                }
            }
            if let (Some(nested), Some(value)) = (attribute.nested_schema(), config.get_mut(name)) {
                for_each_block_mut(value, |block| nested.apply_defaults(block));
            }
        }
    }

    /// Canonicalizes values: sets of scalars are sorted and deduplicated.
    pub fn normalize(&self, attrs: &mut Attributes) {
        for (name, attribute) in &self.attributes {
            let Some(value) = attrs.get_mut(name) else {
                continue;
            };
            if attribute.value_type == ValueType::Set {
                if let (Some(Elem::Type(_)), Value::Array(items)) = (&attribute.elem, &mut *value) {
                    items.sort_by(compare_set_items);
                    items.dedup();
                }
            }
            if let Some(nested) = attribute.nested_schema() {
                for_each_block_mut(value, |block| nested.normalize(block));
            }
        }
    }

    /// Copies computed values from the prior state into a planned
    /// configuration wherever the configuration leaves them unset.
    pub fn carry_computed(&self, prior: &Attributes, planned: &mut Attributes) {
        for (name, attribute) in &self.attributes {
            let Some(prior_value) = prior.get(name) else {
                continue;
            };
            if attribute.computed && is_unset(planned.get(name)) {
                planned.insert(name.clone(), prior_value.clone());
                continue;
            }
            let (Some(nested), Some(value)) = (attribute.nested_schema(), planned.get_mut(name))
            else {
                continue;
            };
            match (prior_value, value) {
                (Value::Array(prior_items), Value::Array(items)) => {
                    for (prior_item, item) in prior_items.iter().zip(items.iter_mut()) {
                        if let (Value::Object(p), Value::Object(i)) = (prior_item, item) {
                            nested.carry_computed(p, i);
                        }
                    }
                }
                (Value::Object(prior_map), Value::Object(map)) => {
                    for (key, item) in map.iter_mut() {
                        if let (Some(Value::Object(p)), Value::Object(i)) = (prior_map.get(key), item)
                        {
                            nested.carry_computed(p, i);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Names of force-new attributes whose value differs between a prior
    /// state and a planned configuration.
    pub fn force_new_changes(&self, prior: &Attributes, planned: &Attributes) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|(_, attribute)| attribute.force_new)
            .filter(|(name, _)| !values_equal(prior.get(*name), planned.get(*name)))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        _ => false,
    }
}

fn for_each_block_mut(value: &mut Value, mut f: impl FnMut(&mut Attributes)) {
    match value {
        Value::Array(items) => items.iter_mut().for_each(|item| {
            if let Value::Object(block) = item {
                f(block)
            }
        }),
        Value::Object(map) => map.values_mut().for_each(|item| {
            if let Value::Object(block) = item {
                f(block)
            }
        }),
        _ => {}
    }
}

/// Orders set elements by their contents; strings compare as text rather
/// than by their JSON encoding.
fn compare_set_items(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn check_value(attribute: &Attribute, value: &Value, path: &str, diags: &mut Vec<Diagnostic>) {
    if attribute.value_type == ValueType::Int && value.is_u64() && !value.is_i64() {
        diags.push(Diagnostic::error(format!("Integer value out of range: {}", value)).at(path));
        return;
    }
    if !attribute.value_type.matches(value) {
        diags.push(
            Diagnostic::error(format!(
                "Incorrect attribute value type: expected {:?}",
                attribute.value_type
            ))
            .at(path),
        );
        return;
    }

    let elements: Vec<(String, &Value)> = match value {
        Value::Array(items) => {
            if let Some(max) = attribute.max_items {
                if items.len() > max {
                    diags.push(
                        Diagnostic::error(format!(
                            "Too many list items: at most {} allowed, got {}",
                            max,
                            items.len()
                        ))
                        .at(path),
                    );
                }
            }
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (join_path(path, &i.to_string()), v))
                .collect()
        }
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (join_path(path, k), v))
            .collect(),
        _ => return,
    };

    for (item_path, item) in elements {
        match &attribute.elem {
            Some(Elem::Type(elem_type)) => {
                if !elem_type.matches(item) {
                    diags.push(
                        Diagnostic::error(format!(
                            "Incorrect element type: expected {:?}",
                            elem_type
                        ))
                        .at(item_path),
                    );
                }
            }
            Some(Elem::Block(schema)) => match item {
                Value::Object(block) => schema.validate_at(block, &item_path, diags),
                _ => diags.push(Diagnostic::error("Expected a block").at(item_path)),
            },
            None => {}
        }
    }
}

/// True for values the provider treats as unset: null, empty strings, zero
/// numbers, false and empty collections.
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Compares two attribute values, treating all zero values as equal.
pub fn values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    if is_zero(a) && is_zero(b) {
        return true;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| values_equal(Some(x), Some(y)))
        }
        (Value::Object(xs), Value::Object(ys)) => xs
            .keys()
            .chain(ys.keys())
            .all(|k| values_equal(xs.get(k), ys.get(k))),
        _ => a == b,
    }
}
