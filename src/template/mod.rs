//! Post template system.
//!
//! This module provides:
//! - Template definition with `[variable]` placeholders
//! - Ordered template storage with CRUD operations
//! - The preview renderer (blockquote reflow, instruction injection,
//!   visible fallback for unfilled fields)
//!
//! # Example
//!
//! ```
//! use forum_publisher::template::{render, Template, TemplateKind};
//! use forum_publisher::variable::{Bindings, VariableDefinition};
//!
//! let template = Template::new("t", "Release", TemplateKind::My, "## [game_name]\n> [overview]");
//! let variables = vec![
//!     VariableDefinition::new("game_name", "Nom du jeu"),
//!     VariableDefinition::new("overview", "Synopsis"),
//! ];
//! let bindings: Bindings = [("game_name", "Lost Solace"), ("overview", "A hero.\nA quest.")]
//!     .into_iter()
//!     .collect();
//!
//! let rendered = render(&template, &variables, &bindings);
//! assert_eq!(rendered, "## Lost Solace\n> A hero.\n> A quest.");
//! ```

mod render;
mod store;
mod substitution;
mod types;

pub use render::{
    instruction_block, overview_value, quote_reflow, render, render_with_mode, token_values,
    INSTRUCTIONS_HEADING, INSTRUCTION_MARKER, INSTRUCTION_VARIABLE, OVERVIEW_VARIABLE,
};
pub use store::TemplateStore;
pub use substitution::{placeholders, substitute_tokens, SubstitutionMode};
pub use types::{slugify, Template, TemplateError, TemplateKind, TemplateResult};
