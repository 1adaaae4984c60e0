//! In-memory implementations of the store traits
//!
//! Used by tests and by embedders that opt out of disk persistence.

use crate::media_cache::{ContentStore, DocumentStore, StoredVideo, VaultError, VideoMeta};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// In-memory implementation of ContentStore
///
/// Clones share the same underlying map, so one instance can be handed to
/// the player while another inspects or mutates the stored state.
#[derive(Clone, Default)]
pub struct MemoryContentStore {
    videos: Arc<Mutex<HashMap<String, StoredVideo>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ContentStore for MemoryContentStore {
    async fn has(&self, id: &str) -> Result<bool, VaultError> {
        Ok(self.videos.lock().unwrap().contains_key(id))
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, VaultError> {
        self.videos
            .lock()
            .unwrap()
            .get(id)
            .map(|video| video.data.clone())
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    async fn put(&self, id: &str, data: &[u8], meta: &VideoMeta) -> Result<(), VaultError> {
        let mut videos = self.videos.lock().unwrap();

        // Existing records are never rewritten.
        if videos.contains_key(id) {
            debug!("♻️  Video already stored: {}", meta.name);
            return Ok(());
        }

        videos.insert(
            id.to_string(),
            StoredVideo {
                id: id.to_string(),
                data: data.to_vec(),
                meta: meta.clone(),
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, VaultError> {
        Ok(self.videos.lock().unwrap().remove(id).is_some())
    }

    async fn clear(&self) -> Result<(), VaultError> {
        self.videos.lock().unwrap().clear();
        Ok(())
    }

    async fn usage(&self) -> Result<u64, VaultError> {
        let videos = self.videos.lock().unwrap();
        Ok(videos.values().map(|video| video.data.len() as u64).sum())
    }
}

/// In-memory implementation of DocumentStore
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, VaultError> {
        Ok(self.items.lock().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), VaultError> {
        self.items
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), VaultError> {
        self.items.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> VideoMeta {
        VideoMeta {
            name: name.to_string(),
            size: 1,
            last_modified: 0,
        }
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryContentStore::new();
        let view = store.clone();

        store.put("vid-1", b"x", &meta("a.mp4")).await.unwrap();
        assert!(view.has("vid-1").await.unwrap());

        view.delete("vid-1").await.unwrap();
        assert!(!store.has("vid-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_keeps_first_write() {
        let store = MemoryContentStore::new();

        store.put("vid-1", b"first", &meta("a.mp4")).await.unwrap();
        store.put("vid-1", b"second", &meta("a.mp4")).await.unwrap();

        assert_eq!(store.get("vid-1").await.unwrap(), b"first");
    }

    #[test]
    fn test_document_store_round_trip() {
        let store = MemoryDocumentStore::new();

        assert_eq!(store.get_item("key").unwrap(), None);
        store.set_item("key", "{}").unwrap();
        assert_eq!(store.get_item("key").unwrap(), Some("{}".to_string()));
        store.remove_item("key").unwrap();
        assert_eq!(store.get_item("key").unwrap(), None);
    }
}
