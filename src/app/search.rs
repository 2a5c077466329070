//! Debounced search input.
//!
//! Keystrokes only move a deadline; the query is issued once the caller has
//! been quiet for the configured delay. Every issued query gets a fresh
//! sequence number and only results carrying the newest one are kept.

use std::time::{Duration, Instant};

use crate::catalog::{Track, is_search_query};

#[derive(Debug)]
pub struct SearchState {
    delay: Duration,
    /// Query waiting for its quiet period to elapse.
    pending: Option<(String, Instant)>,
    /// Sequence number of the newest issued query.
    latest: u64,
    results: Option<(String, Vec<Track>)>,
}

impl SearchState {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            latest: 0,
            results: None,
        }
    }

    /// Record the current text of the search box.
    ///
    /// Short queries clear everything: the pending query is dropped and any
    /// in-flight result is invalidated.
    pub fn input(&mut self, query: &str, now: Instant) {
        if !is_search_query(query) {
            self.reset();
            return;
        }
        self.pending = Some((query.trim().to_string(), now + self.delay));
    }

    /// Take the pending query if its quiet period is over, assigning it the
    /// next sequence number.
    pub fn take_due(&mut self, now: Instant) -> Option<(u64, String)> {
        match &self.pending {
            Some((_, at)) if *at <= now => {}
            _ => return None,
        }
        let (query, _) = self.pending.take()?;
        self.latest += 1;
        Some((self.latest, query))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Keep `tracks` if `seq` is still the newest query. Returns whether they
    /// were kept.
    pub fn accept(&mut self, seq: u64, query: String, tracks: Vec<Track>) -> bool {
        if seq != self.latest {
            return false;
        }
        self.results = Some((query, tracks));
        true
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        seq == self.latest
    }

    /// Results of the newest query, or `None` for the unfiltered view.
    pub fn results(&self) -> Option<(&str, &[Track])> {
        self.results
            .as_ref()
            .map(|(q, tracks)| (q.as_str(), tracks.as_slice()))
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.latest += 1;
        self.results = None;
    }
}
