//! Track store: the asynchronous data-access contract the player relies on.
//!
//! `TrackStore` is implemented by `MemoryStore` (in-process; also the demo
//! backend used when no database is configured) and `RestStore` (a hosted
//! realtime database spoken to over its REST API). `Backend` picks one at
//! startup so the rest of the app never checks whether a store "exists".

mod memory;
mod rest;

pub use memory::{MemoryStore, demo_tracks};
pub use rest::RestStore;

use crate::catalog::{NewTrack, Track};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing service could not be reached or answered with an error status.
    #[error("track store unavailable: {0}")]
    Unavailable(String),
    /// The service answered with something we could not decode.
    #[error("malformed store response: {0}")]
    Malformed(String),
    /// A conditional write kept losing against concurrent writers.
    #[error("concurrent update conflict on {0}")]
    Conflict(String),
}

/// Operations the player and the upload flow need from the catalogue.
///
/// Lookups by id answer `Ok(None)` for unknown ids; "not found" is never an
/// error.
#[allow(async_fn_in_trait)]
pub trait TrackStore {
    /// Persist a new track; the store assigns `id` and `timestamp` and starts
    /// both counters at zero.
    async fn create_track(&self, draft: NewTrack) -> Result<Track, StoreError>;

    /// Every track, in no particular order. An empty store is `Ok(vec![])`.
    async fn list_tracks(&self) -> Result<Vec<Track>, StoreError>;

    async fn get_track(&self, id: &str) -> Result<Option<Track>, StoreError>;

    /// Add one play. No-op when the track does not exist.
    async fn increment_plays(&self, id: &str) -> Result<(), StoreError>;

    /// Flip the like of `user_id` on `track_id`, adjusting the track's `likes`
    /// counter (never below zero). Returns the new liked state; `false` when
    /// the track does not exist.
    async fn toggle_like(&self, track_id: &str, user_id: &str) -> Result<bool, StoreError>;

    async fn check_like(&self, track_id: &str, user_id: &str) -> Result<bool, StoreError>;

    /// Case-insensitive substring match on title or artist. Callers suppress
    /// queries that are too short.
    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, StoreError>;
}

/// The store chosen at startup.
pub enum Backend {
    Remote(RestStore),
    /// In-process demo catalogue (no database configured).
    Local(MemoryStore),
}

impl Backend {
    pub fn describe(&self) -> String {
        match self {
            Backend::Remote(s) => format!("remote database at {}", s.base_url()),
            Backend::Local(_) => "local demo catalogue".to_string(),
        }
    }
}

impl TrackStore for Backend {
    async fn create_track(&self, draft: NewTrack) -> Result<Track, StoreError> {
        match self {
            Backend::Remote(s) => s.create_track(draft).await,
            Backend::Local(s) => s.create_track(draft).await,
        }
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, StoreError> {
        match self {
            Backend::Remote(s) => s.list_tracks().await,
            Backend::Local(s) => s.list_tracks().await,
        }
    }

    async fn get_track(&self, id: &str) -> Result<Option<Track>, StoreError> {
        match self {
            Backend::Remote(s) => s.get_track(id).await,
            Backend::Local(s) => s.get_track(id).await,
        }
    }

    async fn increment_plays(&self, id: &str) -> Result<(), StoreError> {
        match self {
            Backend::Remote(s) => s.increment_plays(id).await,
            Backend::Local(s) => s.increment_plays(id).await,
        }
    }

    async fn toggle_like(&self, track_id: &str, user_id: &str) -> Result<bool, StoreError> {
        match self {
            Backend::Remote(s) => s.toggle_like(track_id, user_id).await,
            Backend::Local(s) => s.toggle_like(track_id, user_id).await,
        }
    }

    async fn check_like(&self, track_id: &str, user_id: &str) -> Result<bool, StoreError> {
        match self {
            Backend::Remote(s) => s.check_like(track_id, user_id).await,
            Backend::Local(s) => s.check_like(track_id, user_id).await,
        }
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, StoreError> {
        match self {
            Backend::Remote(s) => s.search_tracks(query).await,
            Backend::Local(s) => s.search_tracks(query).await,
        }
    }
}

#[cfg(test)]
mod tests;
