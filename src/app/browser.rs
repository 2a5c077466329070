//! Cursor and view state of the track browser.
//!
//! The browser never holds tracks itself; `rows` maps the current view (or
//! the latest search results) onto the controller's loaded list.

use crate::audio::MediaElement;
use crate::catalog::{Track, View};
use crate::store::TrackStore;

use super::controller::Controller;

/// An overlay drawn over the track list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    /// Details of the highlighted track.
    Details,
    /// A share link ready to copy.
    Share(String),
}

/// A visible row. `index` points into `Controller::tracks`; search hits the
/// loaded list does not contain have none and cannot be played.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub index: Option<usize>,
    pub track: &'a Track,
}

#[derive(Debug, Default)]
pub struct Browser {
    pub view: View,
    /// "Show all" instead of the top of the view.
    pub expanded: bool,
    /// Position within the visible rows.
    pub cursor: usize,
    /// Keystrokes go to the search box.
    pub typing: bool,
    pub query: String,
    pub popup: Option<Popup>,
}

impl Browser {
    pub fn searching(&self) -> bool {
        !self.query.trim().is_empty()
    }

    pub fn rows<'a, S, M>(&self, ctrl: &'a Controller<S, M>) -> Vec<Row<'a>>
    where
        S: TrackStore + 'static,
        M: MediaElement,
    {
        if self.searching() {
            if let Some((_, rows)) = ctrl.search_rows() {
                return rows
                    .into_iter()
                    .map(|r| Row {
                        index: r.index,
                        track: r.track,
                    })
                    .collect();
            }
            // Short or not yet answered: the unfiltered list.
            return index_rows(ctrl.tracks(), &ctrl.view_indices(View::All, true));
        }
        index_rows(ctrl.tracks(), &ctrl.view_indices(self.view, self.expanded))
    }

    /// Heading for the list block.
    pub fn title(&self, limit_hint: Option<usize>) -> String {
        if self.searching() {
            return format!("Search: {}", self.query.trim());
        }
        match (self.view, self.expanded, limit_hint) {
            (View::All, _, _) | (_, true, _) | (_, _, None) => self.view.title().to_string(),
            (_, false, Some(n)) => format!("{} (top {n})", self.view.title()),
        }
    }

    pub fn set_view(&mut self, view: View) {
        if self.view != view {
            self.view = view;
            self.cursor = 0;
        }
    }

    pub fn toggle_expanded(&mut self) {
        self.expanded = !self.expanded;
        self.cursor = 0;
    }

    pub fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let max = len - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(max);
    }

    /// Keep the cursor inside `len` rows after the list changed under it.
    pub fn clamp_cursor(&mut self, len: usize) {
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.cursor = 0;
    }

    pub fn pop_char(&mut self) {
        self.query.pop();
        self.cursor = 0;
    }

    pub fn clear_search(&mut self) {
        self.query.clear();
        self.typing = false;
        self.cursor = 0;
    }

    pub fn toggle_popup(&mut self, popup: Popup) {
        if self.popup.as_ref() == Some(&popup) {
            self.popup = None;
        } else {
            self.popup = Some(popup);
        }
    }
}

fn index_rows<'a>(tracks: &'a [Track], indices: &[usize]) -> Vec<Row<'a>> {
    indices
        .iter()
        .filter_map(|&i| {
            tracks.get(i).map(|track| Row {
                index: Some(i),
                track,
            })
        })
        .collect()
}
