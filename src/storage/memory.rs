//! In-memory state store using DashMap.
//!
//! Values are lost on exit; used by tests and by `storage.backend = "memory"`.

use dashmap::DashMap;

use super::{validate_key, StateStore, StoreResult};

/// In-memory state store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        Ok(self.values.get(key).map(|v| v.clone()))
    }

    fn save(&self, key: &str, json: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.values.insert(key.to_string(), json.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_remove() {
        let store = MemoryStore::new();
        assert!(store.load("postTitle").unwrap().is_none());

        store.save("postTitle", "\"Lost Solace\"").unwrap();
        assert_eq!(store.load("postTitle").unwrap().as_deref(), Some("\"Lost Solace\""));
        assert_eq!(store.len(), 1);

        store.remove("postTitle").unwrap();
        store.remove("postTitle").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_key_rejected() {
        let store = MemoryStore::new();
        assert!(store.save("a/b", "1").is_err());
    }
}
