//! Startup reconciliation between the metadata ledger and the content store
//!
//! The ledger and the blob store are independent; the browser-storage-class
//! backing of the blob store can lose records on its own (storage pressure,
//! manual clearing). Entries whose blob is gone are dropped from the recents
//! list rather than surfaced as errors.

use crate::media_cache::{ContentStore, RecentEntry};
use tracing::{info, warn};

/// Filter ledger entries down to those with a stored blob
///
/// All existence checks run concurrently and are joined as a batch; a
/// failed check demotes that one entry to "missing" instead of failing the
/// batch. Relative order of surviving entries is preserved.
pub async fn reconcile(entries: Vec<RecentEntry>, store: &dyn ContentStore) -> Vec<RecentEntry> {
    if entries.is_empty() {
        return entries;
    }

    let checks = entries.iter().map(|entry| store.has(&entry.id));
    let results = futures::future::join_all(checks).await;

    let mut valid = Vec::with_capacity(entries.len());
    for (entry, result) in entries.into_iter().zip(results) {
        match result {
            Ok(true) => valid.push(entry),
            Ok(false) => {
                info!("Video {} has no stored content, dropping from recents", entry.name);
            }
            Err(e) => {
                warn!(
                    "Existence check failed for {}: {}, treating as missing",
                    entry.name, e
                );
            }
        }
    }

    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_cache::memory::MemoryContentStore;
    use crate::media_cache::{VaultError, VideoMeta};
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn entry(id: &str) -> RecentEntry {
        RecentEntry::new(
            id.to_string(),
            &VideoMeta {
                name: format!("{}.mp4", id),
                size: 1,
                last_modified: 0,
            },
            None,
        )
    }

    /// Content store whose existence checks fail for chosen ids
    struct FlakyStore {
        inner: MemoryContentStore,
        failing: Mutex<HashSet<String>>,
    }

    #[async_trait::async_trait]
    impl ContentStore for FlakyStore {
        async fn has(&self, id: &str) -> Result<bool, VaultError> {
            if self.failing.lock().unwrap().contains(id) {
                return Err(VaultError::Database("disk on fire".to_string()));
            }
            self.inner.has(id).await
        }

        async fn get(&self, id: &str) -> Result<Vec<u8>, VaultError> {
            self.inner.get(id).await
        }

        async fn put(&self, id: &str, data: &[u8], meta: &VideoMeta) -> Result<(), VaultError> {
            self.inner.put(id, data, meta).await
        }

        async fn delete(&self, id: &str) -> Result<bool, VaultError> {
            self.inner.delete(id).await
        }

        async fn clear(&self) -> Result<(), VaultError> {
            self.inner.clear().await
        }

        async fn usage(&self) -> Result<u64, VaultError> {
            self.inner.usage().await
        }
    }

    fn meta() -> VideoMeta {
        VideoMeta {
            name: "x.mp4".to_string(),
            size: 1,
            last_modified: 0,
        }
    }

    #[tokio::test]
    async fn test_drops_orphans_preserving_order() {
        let store = MemoryContentStore::new();
        store.put("a", b"1", &meta()).await.unwrap();
        store.put("c", b"3", &meta()).await.unwrap();

        let valid = reconcile(vec![entry("a"), entry("b"), entry("c")], &store).await;

        let ids: Vec<&str> = valid.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_check_failure_is_treated_as_missing() {
        let inner = MemoryContentStore::new();
        inner.put("a", b"1", &meta()).await.unwrap();
        inner.put("b", b"2", &meta()).await.unwrap();

        let store = FlakyStore {
            inner,
            failing: Mutex::new(HashSet::from(["b".to_string()])),
        };

        let valid = reconcile(vec![entry("a"), entry("b")], &store).await;

        let ids: Vec<&str> = valid.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let store = MemoryContentStore::new();
        assert!(reconcile(Vec::new(), &store).await.is_empty());
    }
}
