//! Audio output: the single media element the player drives.
//!
//! `AudioPlayer` owns one background thread holding the `rodio` output
//! stream. Commands go in over a channel; readiness, failures and natural
//! ends come back as `MediaEvent`s tagged with the load token so the
//! controller can drop events for a selection it has already left.

mod player;
mod sink;
mod thread;
mod types;

pub use player::AudioPlayer;
pub use types::*;
