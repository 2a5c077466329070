//! Application module: the player controller and its helpers.
//!
//! `Controller` in `app::controller` owns the session state (loaded tracks,
//! current selection, playback state, likes, search) and the single media
//! element. Store calls it issues come back as `Completion` values which are
//! applied behind a staleness guard.

mod browser;
mod controller;
mod deeplink;
mod model;
mod search;

pub use browser::{Browser, Popup, Row};
pub use controller::*;
pub use deeplink::{parse_track_id, share_link};
pub use model::*;
pub use search::SearchState;
