//! Template types and error definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Template-specific error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template not found at index {0}")]
    NotFound(usize),

    #[error("Template already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Category tag of a template.
///
/// Only `My` and `Partner` templates can be published; every other tag marks a
/// copy-only template and is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum TemplateKind {
    /// Own translations forum
    My,
    /// Partner translations forum
    Partner,
    Other(String),
    #[default]
    Untyped,
}

impl TemplateKind {
    pub fn is_publishable(&self) -> bool {
        matches!(self, TemplateKind::My | TemplateKind::Partner)
    }

    /// Wire value sent as the `template` form field
    pub fn as_str(&self) -> &str {
        match self {
            TemplateKind::My => "my",
            TemplateKind::Partner => "partner",
            TemplateKind::Other(tag) => tag,
            TemplateKind::Untyped => "",
        }
    }
}

impl From<&str> for TemplateKind {
    fn from(tag: &str) -> Self {
        match tag {
            "my" => TemplateKind::My,
            "partner" => TemplateKind::Partner,
            "" => TemplateKind::Untyped,
            other => TemplateKind::Other(other.to_string()),
        }
    }
}

impl From<Option<String>> for TemplateKind {
    fn from(tag: Option<String>) -> Self {
        tag.as_deref().map(TemplateKind::from).unwrap_or_default()
    }
}

impl From<TemplateKind> for Option<String> {
    fn from(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::Untyped => None,
            other => Some(other.as_str().to_string()),
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A post template with `[name]` placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Stable identifier
    #[serde(default)]
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default, rename = "type")]
    pub kind: TemplateKind,

    /// Body text with `[name]` tokens and an optional `[instruction]` marker
    #[serde(rename = "content")]
    pub body: String,
}

impl Template {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: TemplateKind,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            body: body.into(),
        }
    }

    /// Validate the template
    pub fn validate(&self) -> TemplateResult<()> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "Name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Derive a template id from its display name.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single `-` and trims leading/trailing dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "template".to_string()
    } else {
        slug
    }
}
