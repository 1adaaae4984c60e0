//! Bounded most-recently-played-first collection of video entries

use crate::media_cache::RecentEntry;

/// Maximum number of entries the recents list holds
pub const MAX_RECENT_VIDEOS: usize = 20;

/// In-memory ordered sequence of recent videos, unique by id
///
/// This is the process-lifetime mirror of the ledger's entry list; the
/// player write-throughs every mutation back to the ledger.
#[derive(Debug, Default)]
pub struct RecentsCollection {
    entries: Vec<RecentEntry>,
}

impl RecentsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an already-validated entry list, e.g. after reconciliation
    pub fn from_entries(entries: Vec<RecentEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&RecentEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut RecentEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    /// Move an entry to the front, returning whether it was present
    pub fn promote(&mut self, id: &str) -> bool {
        match self.index_of(id) {
            Some(0) => true,
            Some(index) => {
                let entry = self.entries.remove(index);
                self.entries.insert(0, entry);
                true
            }
            None => false,
        }
    }

    /// Insert a new entry at the front
    ///
    /// When the bound is exceeded the oldest (tail) entry is evicted and
    /// returned; only its list membership is dropped, its stored blob and
    /// position entry stay behind.
    pub fn insert_new(&mut self, entry: RecentEntry) -> Option<RecentEntry> {
        self.entries.insert(0, entry);
        if self.entries.len() > MAX_RECENT_VIDEOS {
            self.entries.pop()
        } else {
            None
        }
    }

    /// Remove an entry, returning it if present
    pub fn remove(&mut self, id: &str) -> Option<RecentEntry> {
        self.index_of(id).map(|index| self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
