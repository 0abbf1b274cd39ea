//! Variable definitions and registry errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry-specific error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Variable already exists: {0}")]
    AlreadyExists(String),

    #[error("Variable not found at index {0}")]
    NotFound(usize),

    #[error("Invalid variable name: {0}")]
    InvalidName(String),

    #[error("Built-in variable cannot be deleted: {0}")]
    BuiltIn(String),
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Input widget used to edit a variable.
///
/// Only affects how the value is typed in; rendering treats all kinds alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    #[default]
    #[serde(rename = "single-line", alias = "text")]
    SingleLine,
    #[serde(rename = "multi-line", alias = "textarea")]
    MultiLine,
    #[serde(rename = "choice", alias = "select")]
    Choice,
}

/// A variable that templates may reference as `[name]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    /// Unique name, used as placeholder token and binding key
    pub name: String,

    /// Display label
    pub label: String,

    /// Example value shown in an empty input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: VariableKind,

    /// Allowed values for `VariableKind::Choice`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Template ids this variable is shown for (empty = all)
    #[serde(default, rename = "templates", skip_serializing_if = "Vec::is_empty")]
    pub scoped_template_ids: Vec<String>,

    /// Custom (non built-in) variable
    #[serde(default, rename = "isCustom")]
    pub is_user_defined: bool,
}

impl VariableDefinition {
    /// Create a single-line built-in variable
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            placeholder: None,
            kind: VariableKind::SingleLine,
            options: Vec::new(),
            scoped_template_ids: Vec::new(),
            is_user_defined: false,
        }
    }

    pub fn with_kind(mut self, kind: VariableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn scoped_to(mut self, template_ids: Vec<String>) -> Self {
        self.scoped_template_ids = template_ids;
        self
    }

    /// Whether the variable is offered when editing the given template
    pub fn applies_to(&self, template_id: &str) -> bool {
        self.scoped_template_ids.is_empty()
            || self.scoped_template_ids.iter().any(|id| id == template_id)
    }

    /// The placeholder token this variable fills, e.g. `[game_name]`
    pub fn token(&self) -> String {
        format!("[{}]", self.name)
    }

    /// Validate the variable name.
    ///
    /// Names may not be empty, contain brackets, or span lines, since the
    /// token would then never match as a single `[name]` run.
    pub fn validate(&self) -> RegistryResult<()> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidName("name must not be empty".to_string()));
        }
        if name.contains(['[', ']', '\n', '\r']) {
            return Err(RegistryError::InvalidName(format!(
                "'{}' must not contain brackets or line breaks",
                name
            )));
        }
        Ok(())
    }
}
