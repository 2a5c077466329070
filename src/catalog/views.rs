//! Derived orderings over a loaded track list.
//!
//! Every view returns indices into the slice it was given, so a row can be
//! mapped straight back to `Controller::select_track`.

use super::model::Track;

/// Queries shorter than this (in characters, after trimming) mean "no filter".
pub const MIN_SEARCH_CHARS: usize = 2;

/// Which list the browser is showing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Popular,
    New,
    All,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            View::Popular => "Popular",
            View::New => "New",
            View::All => "All tracks",
        }
    }

    /// Cycle `Popular -> New -> All -> Popular`.
    pub fn next(self) -> Self {
        match self {
            View::Popular => View::New,
            View::New => View::All,
            View::All => View::Popular,
        }
    }
}

/// Indices ordered by `plays` descending; ties keep list order.
/// `limit = None` is the "show all" variant.
pub fn popular(tracks: &[Track], limit: Option<usize>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tracks.len()).collect();
    order.sort_by(|&a, &b| tracks[b].plays.cmp(&tracks[a].plays));
    truncate(order, limit)
}

/// Indices ordered by creation `timestamp` descending; ties keep list order.
pub fn newest(tracks: &[Track], limit: Option<usize>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tracks.len()).collect();
    order.sort_by(|&a, &b| tracks[b].timestamp.cmp(&tracks[a].timestamp));
    truncate(order, limit)
}

/// The full list in its loaded order.
pub fn all(tracks: &[Track]) -> Vec<usize> {
    (0..tracks.len()).collect()
}

fn truncate(mut order: Vec<usize>, limit: Option<usize>) -> Vec<usize> {
    if let Some(n) = limit {
        order.truncate(n);
    }
    order
}

/// True when `query` is long enough to filter on.
pub fn is_search_query(query: &str) -> bool {
    query.trim().chars().count() >= MIN_SEARCH_CHARS
}

/// Case-insensitive substring match against title or artist.
pub fn matches_query(track: &Track, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    track.title.to_lowercase().contains(&needle) || track.artist.to_lowercase().contains(&needle)
}

/// Filter `tracks` by `query`, keeping order.
pub fn search(tracks: &[Track], query: &str) -> Vec<Track> {
    tracks
        .iter()
        .filter(|t| matches_query(t, query))
        .cloned()
        .collect()
}

/// Sort newest-first, the order in which the catalogue is presented after a load.
pub fn sort_newest_first(tracks: &mut [Track]) {
    tracks.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
