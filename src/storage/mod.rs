//! Key-value persistence for draft state.
//!
//! Each piece of state (templates, variables, bindings, history, ...) lives
//! under its own key and is read and written independently; there is no
//! atomic snapshot across keys.
//!
//! - `MemoryStore`: in-memory storage using DashMap, lost on exit
//! - `FileStore`: one `<key>.json` file per key, written atomically
//!
//! Use `create_state_store()` to pick a backend from configuration.

mod file;
mod memory;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::StorageConfig;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Storage keys, one JSON document each
pub mod keys {
    pub const TEMPLATES: &str = "customTemplates";
    pub const VARIABLES: &str = "customVariables";
    pub const BINDINGS: &str = "savedInputs";
    pub const SAVED_TAGS: &str = "savedTags";
    pub const SAVED_INSTRUCTIONS: &str = "savedInstructions";
    pub const SAVED_TRANSLATORS: &str = "savedTraductors";
    pub const UPLOADED_IMAGES: &str = "uploadedImages";
    pub const PUBLISHED_POSTS: &str = "publishedPosts";
    pub const POST_TITLE: &str = "postTitle";
    pub const POST_TAGS: &str = "postTags";
    pub const CURRENT_TEMPLATE: &str = "currentTemplate";
    pub const EDITING_POST: &str = "editingPostId";
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key cannot be used as a storage name
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Filesystem operation failed
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value store holding JSON documents.
pub trait StateStore: Send + Sync {
    /// Backend type identifier
    fn backend_type(&self) -> &'static str;

    /// Raw JSON stored under `key`, if any
    fn load(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replace the JSON stored under `key`
    fn save(&self, key: &str, json: &str) -> StoreResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Load and decode the value stored under `key`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> StoreResult<Option<T>> {
    match store.load(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and store `value` under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let raw = serde_json::to_string(value)?;
    store.save(key, &raw)
}

/// Keys become file names, so only a conservative character set is allowed.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Create a state store based on configuration.
///
/// - `"memory"`: Returns a `MemoryStore`
/// - `"file"` (default): Returns a `FileStore` rooted at `data_dir`
pub fn create_state_store(settings: &StorageConfig) -> Arc<dyn StateStore> {
    match settings.backend.as_str() {
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory state store");
            Arc::new(MemoryStore::new())
        }
        "file" => {
            tracing::info!(
                backend = "file",
                data_dir = %settings.data_dir.display(),
                "Creating file state store"
            );
            Arc::new(FileStore::new(settings.data_dir.clone()))
        }
        other => {
            tracing::warn!(
                backend = %other,
                "Unknown storage backend requested, falling back to file"
            );
            Arc::new(FileStore::new(settings.data_dir.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_key() {
        assert!(validate_key(keys::PUBLISHED_POSTS).is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn test_json_helpers() {
        let store = MemoryStore::new();
        save_json(&store, "numbers", &vec![1, 2, 3]).unwrap();

        let loaded: Option<Vec<u32>> = load_json(&store, "numbers").unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        let missing: Option<Vec<u32>> = load_json(&store, "other").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_load_json_malformed() {
        let store = MemoryStore::new();
        store.save("broken", "{not json").unwrap();
        let result: StoreResult<Option<Vec<u32>>> = load_json(&store, "broken");
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_factory_picks_backend() {
        let memory = create_state_store(&StorageConfig {
            backend: "memory".to_string(),
            data_dir: PathBuf::from("unused"),
            images_dir: PathBuf::from("unused"),
        });
        assert_eq!(memory.backend_type(), "memory");

        let fallback = create_state_store(&StorageConfig {
            backend: "postgres".to_string(),
            data_dir: PathBuf::from("unused"),
            images_dir: PathBuf::from("unused"),
        });
        assert_eq!(fallback.backend_type(), "file");
    }
}
