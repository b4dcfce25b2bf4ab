//! Surprise record storage
//!
//! Records are stored as JSON under `wishprise_<id>`. A viewed record and its
//! uploaded media are deleted after the reveal; deleting something that is
//! already gone is not an error.

use std::collections::HashMap;

use crate::record::SurpriseRecord;

/// Key prefix shared by every storage backend
pub const STORAGE_KEY_PREFIX: &str = "wishprise_";

/// Storage failures
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("surprise {0} not found")]
    NotFound(String),
    #[error("stored surprise is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage key for a record id
pub fn storage_key(id: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{id}")
}

/// Record storage collaborator
pub trait SurpriseStore {
    fn load(&self, id: &str) -> Result<SurpriseRecord, PersistenceError>;

    fn save(&mut self, record: &SurpriseRecord) -> Result<(), PersistenceError>;

    /// Delete a record and the media it references; idempotent
    fn delete(&mut self, id: &str, media: &[String]) -> Result<(), PersistenceError>;
}

/// In-memory store holding serialized records
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    media: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with one record already saved
    pub fn with_record(record: &SurpriseRecord) -> Result<Self, PersistenceError> {
        let mut store = Self::new();
        store.save(record)?;
        Ok(store)
    }

    /// Register an uploaded media blob
    pub fn put_media(&mut self, url: &str, bytes: Vec<u8>) {
        self.media.insert(url.to_string(), bytes);
    }

    pub fn has_media(&self, url: &str) -> bool {
        self.media.contains_key(url)
    }

    /// Insert raw JSON under an id (corrupt-data tests)
    pub fn put_raw(&mut self, id: &str, json: &str) {
        self.entries.insert(storage_key(id), json.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(&storage_key(id))
    }
}

impl SurpriseStore for MemoryStore {
    fn load(&self, id: &str) -> Result<SurpriseRecord, PersistenceError> {
        let json = self
            .entries
            .get(&storage_key(id))
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(json)?)
    }

    fn save(&mut self, record: &SurpriseRecord) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(record)?;
        self.entries.insert(storage_key(&record.id), json);
        Ok(())
    }

    fn delete(&mut self, id: &str, media: &[String]) -> Result<(), PersistenceError> {
        self.entries.remove(&storage_key(id));
        for url in media {
            self.media.remove(url);
        }
        Ok(())
    }
}

/// Browser LocalStorage store
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Result<web_sys::Storage, PersistenceError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| PersistenceError::Unavailable("LocalStorage".to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
impl SurpriseStore for LocalStorageStore {
    fn load(&self, id: &str) -> Result<SurpriseRecord, PersistenceError> {
        let storage = Self::storage()?;
        let json = storage
            .get_item(&storage_key(id))
            .map_err(|e| PersistenceError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&mut self, record: &SurpriseRecord) -> Result<(), PersistenceError> {
        let storage = Self::storage()?;
        let json = serde_json::to_string(record)?;
        storage
            .set_item(&storage_key(&record.id), &json)
            .map_err(|e| PersistenceError::Unavailable(format!("{:?}", e)))
    }

    fn delete(&mut self, id: &str, media: &[String]) -> Result<(), PersistenceError> {
        let storage = Self::storage()?;
        storage
            .remove_item(&storage_key(id))
            .map_err(|e| PersistenceError::Unavailable(format!("{:?}", e)))?;
        // Uploaded media are object URLs owned by the page
        for url in media.iter().filter(|u| u.starts_with("blob:")) {
            let _ = web_sys::Url::revoke_object_url(url);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> SurpriseRecord {
        SurpriseRecord {
            id: id.to_string(),
            song_url: Some("blob:song".to_string()),
            ..SurpriseRecord::demo()
        }
    }

    #[test]
    fn test_save_load_roundtrip_uses_prefixed_key() {
        let store = MemoryStore::with_record(&record("abc")).unwrap();
        assert!(store.contains("abc"));
        assert_eq!(storage_key("abc"), "wishprise_abc");
        assert_eq!(store.load("abc").unwrap().id, "abc");
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.load("nope"), Err(PersistenceError::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn test_corrupt_record() {
        let mut store = MemoryStore::new();
        store.put_raw("bad", "{\"id\":");
        assert!(matches!(store.load("bad"), Err(PersistenceError::Corrupt(_))));
    }

    #[test]
    fn test_delete_is_idempotent_and_removes_media() {
        let rec = record("abc");
        let mut store = MemoryStore::with_record(&rec).unwrap();
        store.put_media("blob:song", vec![1, 2, 3]);

        store.delete("abc", &rec.media_urls()).unwrap();
        assert!(!store.contains("abc"));
        assert!(!store.has_media("blob:song"));

        store.delete("abc", &rec.media_urls()).unwrap();
    }
}
