//! Durable metadata ledger
//!
//! The recents list and the playback-position map are persisted together as
//! one JSON document under a single well-known key. Every save overwrites
//! the whole document; there are no partial updates.

use crate::media_cache::{DocumentStore, RecentEntry, VaultError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Well-known key the player document is stored under
pub const LEDGER_KEY: &str = "video-player-app-data";

/// The whole-document state the ledger persists
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LedgerDocument {
    /// Last-known playback offset in seconds, keyed by video identity
    #[serde(default)]
    pub positions: HashMap<String, f64>,
    /// Recent videos, most-recently-played first
    #[serde(default)]
    pub recents: Vec<RecentEntry>,
}

/// Durable small-record store for recents and playback positions
pub struct MetadataLedger {
    store: Box<dyn DocumentStore>,
}

impl MetadataLedger {
    pub fn new(store: Box<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Load the persisted document
    ///
    /// A missing document is the first-run condition and yields empty state.
    /// A malformed document is discarded and also yields empty state; startup
    /// never fails on ledger contents.
    pub fn load(&self) -> LedgerDocument {
        match self.store.get_item(LEDGER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<LedgerDocument>(&raw) {
                Ok(doc) => {
                    debug!(
                        "Loaded ledger: {} recents, {} positions",
                        doc.recents.len(),
                        doc.positions.len()
                    );
                    doc
                }
                Err(e) => {
                    let err = VaultError::MalformedLedger(e.to_string());
                    warn!("Discarding ledger document: {}", err);
                    LedgerDocument::default()
                }
            },
            Ok(None) => {
                info!("No prior ledger document, starting empty");
                LedgerDocument::default()
            }
            Err(e) => {
                warn!("Failed to read ledger document: {}, starting empty", e);
                LedgerDocument::default()
            }
        }
    }

    /// Overwrite the persisted document with the full current state
    pub fn save(&self, doc: &LedgerDocument) -> Result<(), VaultError> {
        let raw = serde_json::to_string(doc).map_err(|e| VaultError::Storage(Box::new(e)))?;
        self.store.set_item(LEDGER_KEY, &raw)
    }

    /// Remove the persisted document
    pub fn clear(&self) -> Result<(), VaultError> {
        self.store.remove_item(LEDGER_KEY)
    }
}

/// File-backed implementation of DocumentStore
///
/// Each key maps to one JSON file under the base directory. Writes go to a
/// temporary file first and are renamed into place, so a crash mid-write
/// leaves the previous document intact.
pub struct FileDocumentStore {
    base_path: PathBuf,
}

impl FileDocumentStore {
    /// Create a file-backed document store
    ///
    /// The base_path will be created if it doesn't exist.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, VaultError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        info!("Initialized FileDocumentStore at {:?}", base_path);
        Ok(Self { base_path })
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

impl DocumentStore for FileDocumentStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, VaultError> {
        match fs::read_to_string(self.key_to_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::Io(e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), VaultError> {
        let final_path = self.key_to_path(key);

        // Write to a temporary file first
        let temp_path = final_path.with_extension("json.tmp");
        fs::write(&temp_path, value)?;

        // Atomically move to final location
        fs::rename(&temp_path, &final_path)?;

        debug!("Stored document {} at {:?}", key, final_path);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), VaultError> {
        match fs::remove_file(self.key_to_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_cache::memory::MemoryDocumentStore;
    use crate::media_cache::VideoMeta;
    use tempfile::TempDir;

    fn entry(id: &str) -> RecentEntry {
        RecentEntry::new(
            id.to_string(),
            &VideoMeta {
                name: format!("{}.mp4", id),
                size: 100,
                last_modified: 1700000000000,
            },
            Some("thumb".to_string()),
        )
    }

    #[test]
    fn test_first_run_is_empty() {
        let ledger = MetadataLedger::new(Box::new(MemoryDocumentStore::new()));

        let doc = ledger.load();
        assert!(doc.recents.is_empty());
        assert!(doc.positions.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let store = MemoryDocumentStore::new();
        let ledger = MetadataLedger::new(Box::new(store.clone()));

        let mut doc = LedgerDocument::default();
        doc.recents.push(entry("vid-a"));
        doc.positions.insert("vid-a".to_string(), 42.5);
        ledger.save(&doc).unwrap();

        let loaded = MetadataLedger::new(Box::new(store)).load();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_malformed_document_is_discarded() {
        let store = MemoryDocumentStore::new();
        store.set_item(LEDGER_KEY, "{not json at all").unwrap();

        let doc = MetadataLedger::new(Box::new(store)).load();
        assert_eq!(doc, LedgerDocument::default());
    }

    #[test]
    fn test_missing_fields_default() {
        let store = MemoryDocumentStore::new();
        store.set_item(LEDGER_KEY, "{}").unwrap();

        let doc = MetadataLedger::new(Box::new(store)).load();
        assert!(doc.recents.is_empty());
        assert!(doc.positions.is_empty());
    }

    #[test]
    fn test_clear_removes_document() {
        let store = MemoryDocumentStore::new();
        let ledger = MetadataLedger::new(Box::new(store.clone()));

        ledger.save(&LedgerDocument::default()).unwrap();
        assert!(store.get_item(LEDGER_KEY).unwrap().is_some());

        ledger.clear().unwrap();
        assert!(store.get_item(LEDGER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDocumentStore::new(temp_dir.path()).unwrap();

        assert_eq!(store.get_item(LEDGER_KEY).unwrap(), None);
        store.set_item(LEDGER_KEY, r#"{"positions":{}}"#).unwrap();
        assert_eq!(
            store.get_item(LEDGER_KEY).unwrap(),
            Some(r#"{"positions":{}}"#.to_string())
        );

        store.remove_item(LEDGER_KEY).unwrap();
        store.remove_item(LEDGER_KEY).unwrap();
        assert_eq!(store.get_item(LEDGER_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store = FileDocumentStore::new(temp_dir.path()).unwrap();
            let ledger = MetadataLedger::new(Box::new(store));
            let mut doc = LedgerDocument::default();
            doc.positions.insert("vid-a".to_string(), 10.0);
            ledger.save(&doc).unwrap();
        }

        let store = FileDocumentStore::new(temp_dir.path()).unwrap();
        let doc = MetadataLedger::new(Box::new(store)).load();
        assert_eq!(doc.positions.get("vid-a"), Some(&10.0));
    }
}
