//! Supplementary draft state types

use serde::{Deserialize, Serialize};

use crate::template::TemplateKind;

/// Forum tag saved for reuse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTag {
    pub name: String,

    /// Discord tag id, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Template kind the tag belongs to
    #[serde(
        default,
        rename = "template",
        skip_serializing_if = "Option::is_none"
    )]
    pub template_kind: Option<TemplateKind>,
}

impl SavedTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            template_kind: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn for_kind(mut self, kind: TemplateKind) -> Self {
        self.template_kind = Some(kind);
        self
    }
}
