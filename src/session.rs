//! Playback session state machine
//!
//! Tracks the single current video, releases transient source handles
//! before they can leak across rapid selections, applies the end-of-video
//! resume guard, and discards loads that were superseded mid-flight.

use crate::media_cache::VaultError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Saved positions within this many seconds of the end are treated as
/// "already watched" and playback restarts from zero.
pub const RESUME_END_GUARD_SECS: f64 = 5.0;

/// Why a load was issued
///
/// Autoplay-chain loads track position like any other playback but must not
/// disturb recency ordering or last-played timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    UserSelected,
    AutoAdvanced,
}

/// Transient playable source attached to the embedder's media element
///
/// The analogue of an object URL over a blob: it must be released before a
/// replacement is installed, and before its backing blob is deleted.
pub trait SourceHandle: Send {
    /// Duration of the attached media, in seconds
    fn duration(&self) -> f64;

    /// Release the underlying resource
    fn release(&mut self);
}

/// Collaborator that turns raw video bytes into a playable source
#[async_trait::async_trait]
pub trait SourceResolver: Send + Sync {
    async fn open(&self, data: Vec<u8>) -> Result<Box<dyn SourceHandle>, VaultError>;
}

/// Observable session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No current video
    Idle,
    /// A source is being resolved
    Loading,
    /// Source attached, duration known
    Ready,
    /// Source failed to resolve; carries the user-facing message
    Error(String),
}

/// Notifications for the UI collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Ready {
        id: String,
        duration: f64,
        resume_at: f64,
    },
    Error {
        message: String,
    },
}

struct CurrentVideo {
    id: String,
    handle: Box<dyn SourceHandle>,
}

/// State machine for the one active playback slot
pub struct PlaybackSession {
    state: SessionState,
    current: Option<CurrentVideo>,
    generation: u64,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            current: None,
            generation: 0,
            events: None,
        }
    }

    /// Subscribe to ready/error notifications
    ///
    /// Only the most recent subscriber receives events.
    pub fn subscribe(&mut self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|current| current.id.as_str())
    }

    pub fn duration(&self) -> Option<f64> {
        self.current.as_ref().map(|current| current.handle.duration())
    }

    /// Begin a load, superseding any in-flight one
    ///
    /// The previously attached handle is released synchronously before the
    /// new load proceeds. Returns the generation token the caller must pass
    /// back to `complete_load`/`fail_load`.
    pub fn begin_load(&mut self) -> u64 {
        self.release_current();
        self.generation += 1;
        self.state = SessionState::Loading;
        self.generation
    }

    /// Whether a generation token still identifies the in-flight load
    pub fn is_current_load(&self, generation: u64) -> bool {
        self.state == SessionState::Loading && self.generation == generation
    }

    /// Attach a resolved source
    ///
    /// Returns the offset playback should resume at, or `None` when the load
    /// was superseded; a superseded handle is released immediately.
    pub fn complete_load(
        &mut self,
        generation: u64,
        id: &str,
        mut handle: Box<dyn SourceHandle>,
        saved_position: Option<f64>,
    ) -> Option<f64> {
        if !self.is_current_load(generation) {
            debug!("Discarding superseded load for {}", id);
            handle.release();
            return None;
        }

        let duration = handle.duration();
        let resume_at = resume_position(saved_position, duration);
        self.current = Some(CurrentVideo {
            id: id.to_string(),
            handle,
        });
        self.state = SessionState::Ready;
        self.emit(SessionEvent::Ready {
            id: id.to_string(),
            duration,
            resume_at,
        });

        Some(resume_at)
    }

    /// Record a failed load
    ///
    /// Clears the current-video reference and surfaces the message; stale
    /// generations are ignored.
    pub fn fail_load(&mut self, generation: u64, message: &str) {
        if !self.is_current_load(generation) {
            return;
        }

        warn!("Source failed to load: {}", message);
        self.release_current();
        self.state = SessionState::Error(message.to_string());
        self.emit(SessionEvent::Error {
            message: message.to_string(),
        });
    }

    /// Stop playback and release the attached source
    pub fn stop(&mut self) {
        self.release_current();
        self.state = SessionState::Idle;
    }

    fn release_current(&mut self) {
        if let Some(mut current) = self.current.take() {
            current.handle.release();
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver just means nobody is listening.
            let _ = events.send(event);
        }
    }
}

/// Apply the end-of-video resume guard
///
/// A saved position counts only when it is more than `RESUME_END_GUARD_SECS`
/// before the known duration; otherwise playback starts from zero.
pub fn resume_position(saved: Option<f64>, duration: f64) -> f64 {
    match saved {
        Some(position) if position > 0.0 && position < duration - RESUME_END_GUARD_SECS => position,
        _ => 0.0,
    }
}
