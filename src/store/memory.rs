use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::catalog::{self, NewTrack, Track};

use super::{StoreError, TrackStore};

const DAY_MS: i64 = 86_400_000;

#[derive(Default)]
struct Inner {
    /// Insertion order is the listing order.
    tracks: Vec<Track>,
    likes: HashSet<(String, String)>,
}

/// In-process track store.
///
/// Counter updates happen under the same lock as the like set, so the
/// read-modify-write race of the remote store does not exist here.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    available: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            available: true,
        }
    }

    /// A store pre-populated with `tracks`, listed in the given order.
    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tracks,
                likes: HashSet::new(),
            }),
            available: true,
        }
    }

    /// Demo catalogue shown when no database is configured.
    pub fn demo() -> Self {
        Self::with_tracks(demo_tracks(chrono::Utc::now().timestamp_millis()))
    }

    /// A store whose backing service is never reachable.
    #[cfg(test)]
    pub fn offline() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            available: false,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        if !self.available {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

/// Two freely licensed tracks used when the real catalogue cannot be loaded.
pub fn demo_tracks(now_ms: i64) -> Vec<Track> {
    vec![
        Track {
            id: "demo-1".to_string(),
            title: "Demo track 1".to_string(),
            artist: "SoundHelix".to_string(),
            audio_url: "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3".to_string(),
            image_url: None,
            genre: Some("pop".to_string()),
            description: None,
            duration_ms: 180_000,
            plays: 42,
            likes: 5,
            timestamp: now_ms - DAY_MS,
            uploader_id: String::new(),
        },
        Track {
            id: "demo-2".to_string(),
            title: "Demo track 2".to_string(),
            artist: "SoundHelix".to_string(),
            audio_url: "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-2.mp3".to_string(),
            image_url: None,
            genre: Some("rock".to_string()),
            description: None,
            duration_ms: 210_000,
            plays: 28,
            likes: 3,
            timestamp: now_ms - 2 * DAY_MS,
            uploader_id: String::new(),
        },
    ]
}

impl TrackStore for MemoryStore {
    async fn create_track(&self, draft: NewTrack) -> Result<Track, StoreError> {
        let mut inner = self.lock()?;
        let id = Uuid::new_v4().to_string();
        let track = draft.into_track(id, chrono::Utc::now().timestamp_millis());
        inner.tracks.push(track.clone());
        Ok(track)
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, StoreError> {
        Ok(self.lock()?.tracks.clone())
    }

    async fn get_track(&self, id: &str) -> Result<Option<Track>, StoreError> {
        Ok(self.lock()?.tracks.iter().find(|t| t.id == id).cloned())
    }

    async fn increment_plays(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(track) = inner.tracks.iter_mut().find(|t| t.id == id) {
            track.plays = track.plays.saturating_add(1);
        }
        Ok(())
    }

    async fn toggle_like(&self, track_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let Some(pos) = inner.tracks.iter().position(|t| t.id == track_id) else {
            return Ok(false);
        };

        let key = (track_id.to_string(), user_id.to_string());
        let liked = if inner.likes.remove(&key) {
            let track = &mut inner.tracks[pos];
            track.likes = track.likes.saturating_sub(1);
            false
        } else {
            inner.likes.insert(key);
            let track = &mut inner.tracks[pos];
            track.likes = track.likes.saturating_add(1);
            true
        };
        Ok(liked)
    }

    async fn check_like(&self, track_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .likes
            .contains(&(track_id.to_string(), user_id.to_string())))
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, StoreError> {
        let inner = self.lock()?;
        Ok(catalog::search(&inner.tracks, query))
    }
}
