//! Application model types: `PlaybackState`, `ControlError` and `Completion`.

use crate::catalog::Track;
use crate::store::StoreError;

/// The playback state of the current selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing selected yet.
    #[default]
    Idle,
    /// A track was selected and its media is being fetched.
    Loading,
    Playing,
    Paused,
    /// The track played to the end; the controller advances right away.
    Ended,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Loading => "Loading",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Ended => "Ended",
        }
    }
}

/// Rejected controller requests. None of them change state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("track index {index} is out of range (0..{len})")]
    InvalidIndex { index: isize, len: usize },
    #[error("no track selected")]
    NoTrackSelected,
    #[error("invalid link base: {0}")]
    InvalidLink(String),
}

/// A settled store call, tagged with what it was issued for.
#[derive(Debug)]
pub enum Completion {
    TracksLoaded(Result<Vec<Track>, StoreError>),
    DeepLinkFetched {
        id: String,
        /// Selection generation when the fetch was issued.
        generation: u64,
        result: Result<Option<Track>, StoreError>,
    },
    PlaysIncremented {
        id: String,
        result: Result<(), StoreError>,
    },
    LikeChecked {
        generation: u64,
        /// Like epoch when the check was issued.
        issued_at: u64,
        track_id: String,
        result: Result<bool, StoreError>,
    },
    LikeToggled {
        track_id: String,
        result: Result<bool, StoreError>,
    },
    SearchResults {
        seq: u64,
        query: String,
        result: Result<Vec<Track>, StoreError>,
    },
}
