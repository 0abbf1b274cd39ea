//! Current form values keyed by variable name

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::registry::VariableRegistry;

/// Mapping from variable name to its current value.
///
/// Missing names read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings with an empty value for every registered variable
    pub fn for_registry(registry: &VariableRegistry) -> Self {
        let values = registry
            .iter()
            .map(|var| (var.name.clone(), String::new()))
            .collect();
        Self { values }
    }

    /// Current value, `""` when unbound
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Overlay previously saved values on top of these
    pub fn merge(&mut self, saved: Bindings) {
        self.values.extend(saved.values);
    }

    /// Drop entries whose name is not registered and is not in `keep`
    pub fn retain_registered(&mut self, registry: &VariableRegistry, keep: &[&str]) -> usize {
        let before = self.values.len();
        self.values
            .retain(|name, _| registry.contains(name) || keep.contains(&name.as_str()));
        before - self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
