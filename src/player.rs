//! Player facade
//!
//! Owns the content store, the metadata ledger, the in-memory mirrors
//! (recents list + playback-position map), and the playback session, and
//! exposes the operations the UI layer drives: select a file, resume from
//! recents, record positions, delete, clear. Every mutation funnels through
//! one write-through save of the whole ledger document.

use crate::media_cache::ledger::{FileDocumentStore, LedgerDocument, MetadataLedger};
use crate::media_cache::recents::RecentsCollection;
use crate::media_cache::sqlite::SqliteContentStore;
use crate::media_cache::{identity, reconcile, ContentStore, RecentEntry, ThumbnailGenerator, VaultError, VideoMeta};
use crate::session::{LoadOrigin, PlaybackSession, SessionEvent, SessionState, SourceResolver};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

/// Outcome of a successful load, for the embedder to act on
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub id: String,
    /// Duration of the attached source in seconds
    pub duration: f64,
    /// Offset playback should resume at, after the end-of-video guard
    pub resume_at: f64,
}

/// Aggregate report from a bulk delete
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeleteReport {
    /// Ids removed from the recents list
    pub removed: Vec<String>,
    /// Ids whose stored content could not be deleted
    pub failed: Vec<String>,
}

impl DeleteReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The video player core
pub struct Player {
    /// `None` means no-binary-persistence mode: playback still works for
    /// the current session but nothing survives a reload.
    content: Option<Arc<dyn ContentStore>>,
    ledger: MetadataLedger,
    recents: RecentsCollection,
    positions: HashMap<String, f64>,
    session: PlaybackSession,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    resolver: Arc<dyn SourceResolver>,
}

impl Player {
    pub fn new(
        content: Option<Arc<dyn ContentStore>>,
        ledger: MetadataLedger,
        thumbnails: Arc<dyn ThumbnailGenerator>,
        resolver: Arc<dyn SourceResolver>,
    ) -> Self {
        if content.is_none() {
            warn!("Content store unavailable, running without binary persistence");
        }
        Self {
            content,
            ledger,
            recents: RecentsCollection::new(),
            positions: HashMap::new(),
            session: PlaybackSession::new(),
            thumbnails,
            resolver,
        }
    }

    /// Open the default disk-backed stores under `storage_dir`
    ///
    /// A content-store initialization failure degrades to
    /// no-binary-persistence mode instead of failing construction.
    pub fn open<P: AsRef<Path>>(
        storage_dir: P,
        thumbnails: Arc<dyn ThumbnailGenerator>,
        resolver: Arc<dyn SourceResolver>,
    ) -> Result<Self, VaultError> {
        let storage_dir = storage_dir.as_ref();
        std::fs::create_dir_all(storage_dir)?;

        let content: Option<Arc<dyn ContentStore>> =
            match SqliteContentStore::new(storage_dir.join("videos.db")) {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    error!(
                        "Failed to initialize video store: {}, continuing without binary persistence",
                        e
                    );
                    None
                }
            };

        let ledger = MetadataLedger::new(Box::new(FileDocumentStore::new(storage_dir)?));
        Ok(Self::new(content, ledger, thumbnails, resolver))
    }

    /// Load persisted state and reconcile it against the content store
    ///
    /// Must complete before the recents list is rendered: entries whose blob
    /// is gone are dropped and the ledger is rewritten to match. When the
    /// content store never initialized, reconciliation is skipped and the
    /// ledger is trusted as-is.
    pub async fn start(&mut self) -> Result<(), VaultError> {
        let doc = self.ledger.load();
        self.positions = doc.positions;

        match &self.content {
            Some(store) => {
                let before = doc.recents.len();
                let valid = reconcile::reconcile(doc.recents, store.as_ref()).await;
                if valid.len() != before {
                    info!("Reconciliation dropped {} orphaned entries", before - valid.len());
                }
                self.recents = RecentsCollection::from_entries(valid);
                // Self-heal the ledger before anyone reads the list.
                self.save()?;
            }
            None => {
                self.recents = RecentsCollection::from_entries(doc.recents);
            }
        }

        Ok(())
    }

    /// Subscribe to playback ready/error notifications
    pub fn subscribe_events(&mut self) -> UnboundedReceiver<SessionEvent> {
        self.session.subscribe()
    }

    pub fn recents(&self) -> &[RecentEntry] {
        self.recents.entries()
    }

    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.session.current_id()
    }

    /// Saved playback offset for a video, 0 when unknown
    pub fn position_of(&self, id: &str) -> f64 {
        self.positions.get(id).copied().unwrap_or(0.0)
    }

    /// Watched percentage for the list UI, 0 while the duration is unknown
    pub fn progress_percent(&self, id: &str) -> u32 {
        let Some(entry) = self.recents.get(id) else {
            return 0;
        };
        if entry.duration <= 0.0 {
            return 0;
        }
        let position = self.position_of(id);
        ((position / entry.duration) * 100.0).clamp(0.0, 100.0).floor() as u32
    }

    pub fn has_persistence(&self) -> bool {
        self.content.is_some()
    }

    /// Total bytes of stored video content, for the quota monitor
    pub async fn storage_usage(&self) -> Result<u64, VaultError> {
        match &self.content {
            Some(store) => store.usage().await,
            None => Ok(0),
        }
    }

    /// Load a freshly picked file: persist its bytes, update recents, and
    /// attach a playable source
    ///
    /// A persistence failure is logged and playback of the selected bytes
    /// proceeds for the session anyway.
    pub async fn select_file(
        &mut self,
        meta: VideoMeta,
        data: Vec<u8>,
    ) -> Result<LoadOutcome, VaultError> {
        let id = identity::derive_id(&meta.name, meta.size, meta.last_modified);

        if let Some(store) = &self.content {
            if let Err(e) = store.put(&id, &data, &meta).await {
                warn!("Failed to persist {}: {}", meta.name, e);
            }
        }

        if self.recents.index_of(&id).is_some() {
            self.recents.promote(&id);
            if let Some(entry) = self.recents.get_mut(&id) {
                entry.last_played = Utc::now();
            }
        } else {
            let thumbnail = self.thumbnails.generate(&data).await;
            let entry = RecentEntry::new(id.clone(), &meta, thumbnail);
            if let Some(evicted) = self.recents.insert_new(entry) {
                // The evicted blob stays in the content store as stale cache.
                debug!("Recents bound reached, dropping {} from the list", evicted.name);
            }
        }
        self.save()?;

        self.load_source(&id, data).await
    }

    /// Resume a video from the recents list
    ///
    /// `UserSelected` loads promote the entry and touch its last-played
    /// timestamp; `AutoAdvanced` loads leave the ordering untouched.
    pub async fn select_from_recents(
        &mut self,
        id: &str,
        origin: LoadOrigin,
    ) -> Result<LoadOutcome, VaultError> {
        let Some(store) = self.content.clone() else {
            return Err(VaultError::StoreUnavailable);
        };
        if self.recents.index_of(id).is_none() {
            return Err(VaultError::NotFound(id.to_string()));
        }

        let data = match store.get(id).await {
            Ok(data) => data,
            Err(e) => {
                // UI message: "Video not found. Please select it again."
                warn!("Stored content for {} could not be fetched: {}", id, e);
                return Err(e);
            }
        };

        if origin == LoadOrigin::UserSelected {
            self.recents.promote(id);
            if let Some(entry) = self.recents.get_mut(id) {
                entry.last_played = Utc::now();
            }
            self.save()?;
        }

        self.load_source(id, data).await
    }

    /// Advance to the next recent video, wrapping at the end of the list
    ///
    /// An autoplay-chain load: the played entry keeps its place in the
    /// recents ordering. No-op when idle or when the current video is no
    /// longer listed.
    pub async fn play_next(&mut self) -> Result<Option<LoadOutcome>, VaultError> {
        let Some(current_id) = self.session.current_id().map(str::to_string) else {
            return Ok(None);
        };
        if self.recents.is_empty() {
            return Ok(None);
        }
        let Some(index) = self.recents.index_of(&current_id) else {
            return Ok(None);
        };

        let next_id = self.recents.entries()[(index + 1) % self.recents.len()]
            .id
            .clone();
        self.select_from_recents(&next_id, LoadOrigin::AutoAdvanced)
            .await
            .map(Some)
    }

    /// Record the current playback offset
    ///
    /// Called by the player-controls collaborator on pause, on end, and
    /// periodically. No-op when nothing is playing or the offset is zero.
    pub fn record_position(&mut self, position: f64) -> Result<(), VaultError> {
        let Some(id) = self.session.current_id().map(str::to_string) else {
            return Ok(());
        };
        if position <= 0.0 {
            return Ok(());
        }

        self.positions.insert(id.clone(), position);
        if let Some(entry) = self.recents.get_mut(&id) {
            entry.last_played = Utc::now();
        }
        self.save()
    }

    /// Remove videos from recents, positions, and the content store
    ///
    /// The visible list and position map are updated first; content-store
    /// deletion failures are reported in aggregate and never roll the list
    /// back. A currently playing video is stopped before its blob is
    /// deleted so the live source handle is released first.
    pub async fn delete_selected(&mut self, ids: &[String]) -> Result<DeleteReport, VaultError> {
        let mut report = DeleteReport::default();

        for id in ids {
            if self.session.current_id() == Some(id.as_str()) {
                self.session.stop();
            }
            if self.recents.remove(id).is_some() {
                report.removed.push(id.clone());
            }
            // Also prunes position keys orphaned by earlier sessions.
            self.positions.remove(id);
        }
        self.save()?;

        if let Some(store) = &self.content {
            let deletes = ids.iter().map(|id| store.delete(id));
            let results = futures::future::join_all(deletes).await;
            for (id, result) in ids.iter().zip(results) {
                if let Err(e) = result {
                    // UI message: "Some videos could not be deleted."
                    warn!("Failed to delete stored content for {}: {}", id, e);
                    report.failed.push(id.clone());
                }
            }
        }

        Ok(report)
    }

    /// Remove everything: recents, positions, and all stored content
    pub async fn clear_all(&mut self) -> Result<(), VaultError> {
        self.session.stop();
        self.recents.clear();
        self.positions.clear();
        self.save()?;

        if let Some(store) = &self.content {
            store.clear().await?;
        }
        Ok(())
    }

    /// Stop playback, releasing the attached source
    pub fn stop(&mut self) {
        self.session.stop();
    }

    /// Final position write for process teardown
    pub fn flush(&mut self, position: f64) -> Result<(), VaultError> {
        self.record_position(position)?;
        self.session.stop();
        Ok(())
    }

    /// Resolve bytes into a playable source and move the session to Ready
    async fn load_source(&mut self, id: &str, data: Vec<u8>) -> Result<LoadOutcome, VaultError> {
        let generation = self.session.begin_load();

        let handle = match self.resolver.open(data).await {
            Ok(handle) => handle,
            Err(e) => {
                // UI message: "Error loading video."
                self.session.fail_load(generation, "Error loading video");
                return Err(VaultError::SourceLoadFailed(e.to_string()));
            }
        };

        let duration = handle.duration();
        let saved = self.positions.get(id).copied();
        let resume_at = match self.session.complete_load(generation, id, handle, saved) {
            Some(resume_at) => resume_at,
            None => return Err(VaultError::SourceLoadFailed("load superseded".to_string())),
        };

        // Record the duration once known.
        let duration_changed = match self.recents.get_mut(id) {
            Some(entry) if entry.duration != duration => {
                entry.duration = duration;
                true
            }
            _ => false,
        };
        if duration_changed {
            self.save()?;
        }

        Ok(LoadOutcome {
            id: id.to_string(),
            duration,
            resume_at,
        })
    }

    /// Write-through the full in-memory state as one ledger document
    fn save(&self) -> Result<(), VaultError> {
        let doc = LedgerDocument {
            positions: self.positions.clone(),
            recents: self.recents.entries().to_vec(),
        };
        self.ledger.save(&doc)
    }
}

/// Format a duration in seconds for display: `m:ss`, or `h:mm:ss` past an hour
///
/// Non-finite or negative input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_cache::memory::{MemoryContentStore, MemoryDocumentStore};
    use crate::session::SourceHandle;

    struct NoThumbs;

    #[async_trait::async_trait]
    impl ThumbnailGenerator for NoThumbs {
        async fn generate(&self, _data: &[u8]) -> Option<String> {
            None
        }
    }

    struct FixedHandle;

    impl SourceHandle for FixedHandle {
        fn duration(&self) -> f64 {
            60.0
        }

        fn release(&mut self) {}
    }

    struct FixedResolver;

    #[async_trait::async_trait]
    impl SourceResolver for FixedResolver {
        async fn open(&self, _data: Vec<u8>) -> Result<Box<dyn SourceHandle>, VaultError> {
            Ok(Box::new(FixedHandle))
        }
    }

    #[tokio::test]
    async fn test_play_next_noop_when_current_no_longer_listed() {
        let mut player = Player::new(
            Some(Arc::new(MemoryContentStore::new())),
            MetadataLedger::new(Box::new(MemoryDocumentStore::new())),
            Arc::new(NoThumbs),
            Arc::new(FixedResolver),
        );
        player.start().await.unwrap();

        let outcome = player
            .select_file(
                VideoMeta {
                    name: "a.mp4".to_string(),
                    size: 5,
                    last_modified: 1,
                },
                b"aaaaa".to_vec(),
            )
            .await
            .unwrap();

        // Drop the playing entry from the list without touching the session.
        player.recents.remove(&outcome.id);

        assert!(player.play_next().await.unwrap().is_none());
        assert_eq!(player.session_state(), &SessionState::Ready);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.9), "0:09");
        assert_eq!(format_time(61.0), "1:01");
        assert_eq!(format_time(3599.0), "59:59");
        assert_eq!(format_time(3600.0), "1:00:00");
        assert_eq!(format_time(3725.0), "1:02:05");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
