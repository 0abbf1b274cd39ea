//! Variable registry and input bindings.
//!
//! - `VariableDefinition`: a named value a template can reference as `[name]`
//! - `VariableRegistry`: ordered definitions, unique names
//! - `Bindings`: the current value of each variable
//!
//! Deleting a variable always goes through `VariableRegistry::delete`, which
//! drops the matching binding in the same call.

mod bindings;
mod registry;
mod types;

pub use bindings::Bindings;
pub use registry::VariableRegistry;
pub use types::{RegistryError, RegistryResult, VariableDefinition, VariableKind};
