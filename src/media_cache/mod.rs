//! Local media persistence for the video player core
//!
//! This module provides abstractions for storing raw video content in a
//! keyed blob store, mirroring lightweight per-video metadata in a small
//! document ledger, and reconciling the two on startup.

pub mod identity;
pub mod ledger;
pub mod memory;
pub mod recents;
pub mod reconcile;
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for media persistence and playback operations
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Storage error: {0}")]
    Storage(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Video not found: {0}")]
    NotFound(String),

    #[error("Content store unavailable")]
    StoreUnavailable,

    #[error("Source failed to load: {0}")]
    SourceLoadFailed(String),

    #[error("Malformed ledger document: {0}")]
    MalformedLedger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for VaultError {
    fn from(e: rusqlite::Error) -> Self {
        VaultError::Database(e.to_string())
    }
}

/// Source-file attributes a video identity is derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMeta {
    /// Original file name
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last-modified timestamp of the file (milliseconds since the epoch)
    pub last_modified: i64,
}

/// A video record persisted in the content store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVideo {
    /// The derived identity (storage key)
    pub id: String,
    /// Raw video bytes
    pub data: Vec<u8>,
    /// Source-file attributes the identity was derived from
    pub meta: VideoMeta,
    /// When the record was first stored
    pub stored_at: DateTime<Utc>,
}

/// Lightweight metadata record mirrored between the durable ledger and the
/// in-memory recents collection
///
/// Serialized field names are camelCase to match the on-disk document shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEntry {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub last_modified: i64,
    /// Encoded preview image, `None` when generation failed
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Duration in seconds, 0 until the source has been attached once
    #[serde(default)]
    pub duration: f64,
    pub last_played: DateTime<Utc>,
}

impl RecentEntry {
    /// Create a fresh entry for a newly loaded video
    pub fn new(id: String, meta: &VideoMeta, thumbnail: Option<String>) -> Self {
        Self {
            id,
            name: meta.name.clone(),
            size: meta.size,
            last_modified: meta.last_modified,
            thumbnail,
            duration: 0.0,
            last_played: Utc::now(),
        }
    }
}

/// Trait for durable storage of raw video content
///
/// This abstraction allows for different storage backends (SQLite, in-memory)
/// while maintaining a consistent interface keyed by video identity.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Check whether a video exists in the store
    async fn has(&self, id: &str) -> Result<bool, VaultError>;

    /// Read the raw bytes for a video
    ///
    /// Fails with `NotFound` when the id has no stored record.
    async fn get(&self, id: &str) -> Result<Vec<u8>, VaultError>;

    /// Store a video's bytes under its identity
    ///
    /// A put for an id that is already present resolves successfully without
    /// rewriting the stored bytes. Concurrent puts for the same id must not
    /// race into two writes.
    async fn put(&self, id: &str, data: &[u8], meta: &VideoMeta) -> Result<(), VaultError>;

    /// Remove a video record, returning whether one existed
    ///
    /// Deleting an absent id is not an error.
    async fn delete(&self, id: &str) -> Result<bool, VaultError>;

    /// Remove all video records
    async fn clear(&self) -> Result<(), VaultError>;

    /// Total bytes of stored video content, for the quota monitor
    async fn usage(&self) -> Result<u64, VaultError>;
}

/// Trait for the string-keyed small-document store backing the ledger
///
/// Modeled on a `getItem`/`setItem` interface; implementations are expected
/// to be synchronous-class local storage.
pub trait DocumentStore: Send + Sync {
    /// Read the document stored under `key`, `None` when absent
    fn get_item(&self, key: &str) -> Result<Option<String>, VaultError>;

    /// Overwrite the document stored under `key`
    fn set_item(&self, key: &str, value: &str) -> Result<(), VaultError>;

    /// Remove the document stored under `key`, absence is not an error
    fn remove_item(&self, key: &str) -> Result<(), VaultError>;
}

/// Collaborator that produces preview images from raw video bytes
///
/// Opaque to the core: a failure to produce a thumbnail is represented as
/// `None`, never as an error.
#[async_trait::async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(&self, data: &[u8]) -> Option<String>;
}
