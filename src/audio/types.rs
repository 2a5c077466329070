//! Audio-related small types and handles.
//!
//! Commands for the audio thread, the events it reports back, the shared
//! `MediaInfo` snapshot and the `MediaElement` seam the controller talks to.

use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
pub enum AudioCmd {
    /// Fetch and decode `url`, leaving it paused; reply with `Ready` or `Failed`.
    Load { url: String, token: u64 },
    /// Start or resume the loaded source.
    Play,
    Pause,
    /// Jump to an absolute position in the loaded source.
    SeekTo(Duration),
    /// Output gain in `0.0..=1.0`.
    SetVolume(f32),
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// Signals emitted by the media element, tagged with the load token.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Ready {
        token: u64,
        duration: Option<Duration>,
    },
    Failed {
        token: u64,
        reason: String,
    },
    /// The source played through to its natural end.
    Ended { token: u64 },
}

#[derive(Debug, Clone, Default)]
/// Runtime playback information shared with the UI.
pub struct MediaInfo {
    /// Token of the most recent load request.
    pub token: u64,
    /// Whether the source for `token` is decoded and ready.
    pub loaded: bool,
    pub playing: bool,
    pub elapsed: Duration,
    pub duration: Option<Duration>,
    /// Set once shutdown is requested; a download in progress stops early.
    pub quitting: bool,
}

pub type MediaHandle = Arc<Mutex<MediaInfo>>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    #[error("nothing is loaded yet")]
    NotLoaded,
    #[error("playback rejected: {0}")]
    Rejected(String),
    #[error("could not load media: {0}")]
    Decode(String),
}

/// Three-step loudness indicator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VolumeTier {
    Muted,
    Low,
    High,
}

impl VolumeTier {
    pub fn from_volume(volume: f32) -> Self {
        if volume <= 0.0 {
            VolumeTier::Muted
        } else if volume < 0.5 {
            VolumeTier::Low
        } else {
            VolumeTier::High
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            VolumeTier::Muted => "🔇",
            VolumeTier::Low => "🔉",
            VolumeTier::High => "🔊",
        }
    }
}

/// The playback surface the controller owns exclusively.
pub trait MediaElement {
    /// Replace the current source. Completion arrives as a `MediaEvent`
    /// carrying `token`.
    fn load(&mut self, url: &str, token: u64);
    /// Start or resume playback of the loaded source.
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn seek_to(&mut self, position: Duration);
    fn set_volume(&mut self, volume: f32);
    /// Length of the loaded source, if known.
    fn duration(&self) -> Option<Duration>;
    fn position(&self) -> Duration;
}
