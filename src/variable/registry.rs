//! Ordered variable registry with unique names

use super::bindings::Bindings;
use super::types::{RegistryError, RegistryResult, VariableDefinition, VariableKind};

/// Ordered collection of variable definitions.
///
/// Names are unique at all times. Order is the order variables were added
/// and is the order the renderer processes them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableRegistry {
    variables: Vec<VariableDefinition>,
}

impl VariableRegistry {
    /// Build a registry from definitions, keeping the first of any duplicate name
    pub fn new(variables: Vec<VariableDefinition>) -> Self {
        let mut registry = Self::default();
        for var in variables {
            if registry.contains(&var.name) {
                tracing::warn!(name = %var.name, "Ignoring duplicate variable definition");
                continue;
            }
            registry.variables.push(var);
        }
        registry
    }

    /// The built-in variables used by the default templates
    pub fn with_defaults() -> Self {
        Self::new(default_variables())
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableDefinition> {
        self.variables.iter()
    }

    pub fn as_slice(&self) -> &[VariableDefinition] {
        &self.variables
    }

    pub fn get(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables offered when editing the given template
    pub fn visible_for(&self, template_id: &str) -> Vec<&VariableDefinition> {
        self.variables
            .iter()
            .filter(|v| v.applies_to(template_id))
            .collect()
    }

    /// Add a custom variable and give it an empty binding.
    pub fn add(
        &mut self,
        mut var: VariableDefinition,
        bindings: &mut Bindings,
    ) -> RegistryResult<&VariableDefinition> {
        var.validate()?;
        if self.contains(&var.name) {
            return Err(RegistryError::AlreadyExists(var.name));
        }

        var.is_user_defined = true;
        if !bindings.contains(&var.name) {
            bindings.set(var.name.clone(), "");
        }

        tracing::debug!(name = %var.name, "Variable added");
        self.variables.push(var);
        Ok(&self.variables[self.variables.len() - 1])
    }

    /// Replace the definition at `index`.
    ///
    /// The custom flag of the replaced entry is kept. When the name changes
    /// the bound value moves to the new name.
    pub fn update(
        &mut self,
        index: usize,
        mut var: VariableDefinition,
        bindings: &mut Bindings,
    ) -> RegistryResult<&VariableDefinition> {
        var.validate()?;
        let current = self
            .variables
            .get(index)
            .ok_or(RegistryError::NotFound(index))?;

        let duplicate = self
            .variables
            .iter()
            .enumerate()
            .any(|(i, v)| i != index && v.name == var.name);
        if duplicate {
            return Err(RegistryError::AlreadyExists(var.name));
        }

        var.is_user_defined = current.is_user_defined;
        if current.name != var.name {
            let value = bindings.remove(&current.name).unwrap_or_default();
            bindings.set(var.name.clone(), value);
        }

        self.variables[index] = var;
        Ok(&self.variables[index])
    }

    /// Remove the definition at `index` together with its binding.
    pub fn delete(
        &mut self,
        index: usize,
        bindings: &mut Bindings,
    ) -> RegistryResult<VariableDefinition> {
        let var = self
            .variables
            .get(index)
            .ok_or(RegistryError::NotFound(index))?;
        if !var.is_user_defined {
            return Err(RegistryError::BuiltIn(var.name.clone()));
        }

        let removed = self.variables.remove(index);
        bindings.remove(&removed.name);

        tracing::debug!(name = %removed.name, "Variable deleted");
        Ok(removed)
    }
}

fn default_variables() -> Vec<VariableDefinition> {
    vec![
        VariableDefinition::new("game_name", "Nom du jeu").with_placeholder("Lost Solace"),
        VariableDefinition::new("game_version", "Version du jeu").with_placeholder("v0.1"),
        VariableDefinition::new("translate_version", "Version de la traduction")
            .with_placeholder("v0.1"),
        VariableDefinition::new("game_link", "Lien du jeu").with_placeholder("https://..."),
        VariableDefinition::new("translate_link", "Lien de la traduction")
            .with_placeholder("https://..."),
        VariableDefinition::new("translator", "Traducteur")
            .with_placeholder("Rory Mercury 91")
            .scoped_to(vec!["partner".to_string()]),
        VariableDefinition::new("overview", "Synopsis")
            .with_kind(VariableKind::MultiLine)
            .with_placeholder("Synopsis du jeu..."),
    ]
}
