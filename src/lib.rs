pub mod media_cache;
pub mod player;
pub mod session;

// Re-export commonly used types
pub use media_cache::ledger::{FileDocumentStore, LedgerDocument, MetadataLedger, LEDGER_KEY};
pub use media_cache::recents::{RecentsCollection, MAX_RECENT_VIDEOS};
pub use media_cache::sqlite::SqliteContentStore;
pub use media_cache::{
    ContentStore, DocumentStore, RecentEntry, ThumbnailGenerator, VaultError, VideoMeta,
};
pub use player::{format_time, DeleteReport, LoadOutcome, Player};
pub use session::{
    LoadOrigin, PlaybackSession, SessionEvent, SessionState, SourceHandle, SourceResolver,
    RESUME_END_GUARD_SECS,
};
