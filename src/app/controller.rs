//! The player controller: one owner for the session state and the media element.
//!
//! Every mutation is synchronous. Store calls are queued as local futures and
//! surface later through `next_completion`; the event loop hands them back to
//! `apply`. Completions and media events that belong to a selection the user
//! has already left are dropped before they touch what the UI shows.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures_util::future::LocalBoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};

use crate::audio::{MediaElement, MediaEvent, PlaybackError, VolumeTier};
use crate::catalog::{self, Track, View};
use crate::config::PlayerSettings;
use crate::store::{StoreError, TrackStore, demo_tracks};

use super::deeplink;
use super::model::{Completion, ControlError, PlaybackState};
use super::search::SearchState;

/// Shown when the first catalogue load fails and the demo list stands in.
pub const STORE_UNAVAILABLE_NOTICE: &str =
    "Track store unavailable. Showing the demo catalogue instead.";

/// A row of the search view. Results the loaded list does not contain have no
/// index and cannot be selected.
#[derive(Debug, Clone, Copy)]
pub struct SearchRow<'a> {
    pub index: Option<usize>,
    pub track: &'a Track,
}

pub struct Controller<S: TrackStore + 'static, M: MediaElement> {
    store: Rc<S>,
    media: M,
    user_id: Rc<str>,

    tracks: Vec<Track>,
    current: Option<usize>,
    current_id: Option<String>,
    /// Bumped on every selection; media loads and like checks carry it.
    generation: u64,
    /// Whether the play for the current generation has been counted.
    play_counted: bool,
    state: PlaybackState,
    volume: f32,

    liked: HashSet<String>,
    /// Like state of the current track once known.
    like_button: Option<bool>,
    /// Serialises toggles and checks so they reach the store in issue order.
    like_lock: Rc<tokio::sync::Mutex<()>>,
    /// Counts toggles issued; a check is stale once a later toggle exists.
    like_epoch: u64,
    /// Epoch of the newest toggle issued per track.
    last_toggle: HashMap<String, u64>,

    search: SearchState,
    popular_limit: usize,
    new_limit: usize,

    deep_link: Option<String>,
    loaded_once: bool,
    notice: Option<String>,
    status: Option<String>,

    pending: FuturesUnordered<LocalBoxFuture<'static, Completion>>,
}

impl<S: TrackStore + 'static, M: MediaElement> Controller<S, M> {
    pub fn new(
        store: Rc<S>,
        mut media: M,
        user_id: impl Into<Rc<str>>,
        settings: &PlayerSettings,
    ) -> Self {
        let volume = f32::from(settings.volume.min(100)) / 100.0;
        media.set_volume(volume);

        Self {
            store,
            media,
            user_id: user_id.into(),
            tracks: Vec::new(),
            current: None,
            current_id: None,
            generation: 0,
            play_counted: false,
            state: PlaybackState::Idle,
            volume,
            liked: HashSet::new(),
            like_button: None,
            like_lock: Rc::new(tokio::sync::Mutex::new(())),
            like_epoch: 0,
            last_toggle: HashMap::new(),
            search: SearchState::new(Duration::from_millis(settings.search_debounce_ms)),
            popular_limit: settings.popular_limit,
            new_limit: settings.new_limit,
            deep_link: None,
            loaded_once: false,
            notice: None,
            status: None,
            pending: FuturesUnordered::new(),
        }
    }

    fn spawn<F>(&mut self, fut: F)
    where
        F: Future<Output = Completion> + 'static,
    {
        self.pending.push(fut.boxed_local());
    }

    /// Load the catalogue; `deep_link` is a track id to select once it arrives.
    pub fn init(&mut self, deep_link: Option<String>) {
        self.deep_link = deep_link.filter(|id| !id.trim().is_empty());
        self.issue_list();
    }

    /// Reload the catalogue, keeping the current selection anchored by id.
    pub fn refresh(&mut self) {
        self.issue_list();
    }

    fn issue_list(&mut self) {
        let store = Rc::clone(&self.store);
        self.spawn(async move { Completion::TracksLoaded(store.list_tracks().await) });
    }

    pub fn select_track(&mut self, index: isize) -> Result<(), ControlError> {
        let len = self.tracks.len();
        let Some(i) = usize::try_from(index).ok().filter(|&i| i < len) else {
            log::warn!("ignoring selection of track {index}: {len} tracks loaded");
            return Err(ControlError::InvalidIndex { index, len });
        };

        let track = &self.tracks[i];
        self.generation += 1;
        self.play_counted = false;
        self.current = Some(i);
        self.current_id = Some(track.id.clone());
        self.like_button = None;
        self.status = None;
        self.state = PlaybackState::Loading;
        log::info!("selected {} ({})", track.id, catalog::display_line(track));
        self.media.load(&track.audio_url, self.generation);
        Ok(())
    }

    pub fn on_media_event(&mut self, event: MediaEvent) {
        let token = match &event {
            MediaEvent::Ready { token, .. }
            | MediaEvent::Failed { token, .. }
            | MediaEvent::Ended { token } => *token,
        };
        if self.generation == 0 || token != self.generation {
            log::debug!("dropping media event for superseded load {token}");
            return;
        }

        match event {
            MediaEvent::Ready { .. } => {
                if self.state != PlaybackState::Loading {
                    return;
                }
                if !self.play_counted {
                    self.play_counted = true;
                    if let Some(id) = self.current_id.clone() {
                        self.issue_increment(id);
                    }
                }
                match self.media.play() {
                    Ok(()) => self.state = PlaybackState::Playing,
                    Err(e) => self.playback_failed(e),
                }
                self.issue_like_check();
            }
            MediaEvent::Failed { reason, .. } => {
                self.playback_failed(PlaybackError::Decode(reason));
                self.issue_like_check();
            }
            MediaEvent::Ended { .. } => {
                self.state = PlaybackState::Ended;
                self.next();
            }
        }
    }

    fn playback_failed(&mut self, e: PlaybackError) {
        log::warn!("playback failed: {e}");
        self.state = PlaybackState::Paused;
        self.status = Some(e.to_string());
    }

    fn issue_increment(&mut self, id: String) {
        let store = Rc::clone(&self.store);
        self.spawn(async move {
            let result = store.increment_plays(&id).await;
            Completion::PlaysIncremented { id, result }
        });
    }

    fn issue_like_check(&mut self) {
        let Some(track_id) = self.current_id.clone() else {
            return;
        };
        let store = Rc::clone(&self.store);
        let user_id = Rc::clone(&self.user_id);
        let lock = Rc::clone(&self.like_lock);
        let generation = self.generation;
        let issued_at = self.like_epoch;
        self.spawn(async move {
            let _turn = lock.lock().await;
            let result = store.check_like(&track_id, &user_id).await;
            Completion::LikeChecked {
                generation,
                issued_at,
                track_id,
                result,
            }
        });
    }

    pub fn toggle_play(&mut self) {
        match self.state {
            PlaybackState::Idle => {
                if !self.tracks.is_empty() {
                    let _ = self.select_track(0);
                }
            }
            PlaybackState::Playing => {
                self.media.pause();
                self.state = PlaybackState::Paused;
            }
            PlaybackState::Paused => self.resume(),
            PlaybackState::Loading | PlaybackState::Ended => {}
        }
    }

    /// Start playback unless something is already playing or loading.
    pub fn play(&mut self) {
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Paused) {
            self.toggle_play();
        }
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.toggle_play();
        }
    }

    fn resume(&mut self) {
        match self.media.play() {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                self.status = None;
            }
            Err(e) => self.playback_failed(e),
        }
    }

    pub fn next(&mut self) {
        let n = self.tracks.len();
        if n == 0 {
            return;
        }
        let i = self.current.map_or(0, |i| (i + 1) % n);
        let _ = self.select_track(i as isize);
    }

    pub fn previous(&mut self) {
        let n = self.tracks.len();
        if n == 0 {
            return;
        }
        let i = self.current.map_or(n - 1, |i| (i + n - 1) % n);
        let _ = self.select_track(i as isize);
    }

    /// Flip the listener's like on the current track. Each call is exactly one
    /// store toggle.
    pub fn toggle_like(&mut self) -> Result<(), ControlError> {
        let track_id = self.current_id.clone().ok_or(ControlError::NoTrackSelected)?;
        let store = Rc::clone(&self.store);
        let user_id = Rc::clone(&self.user_id);
        let lock = Rc::clone(&self.like_lock);
        self.like_epoch += 1;
        self.last_toggle.insert(track_id.clone(), self.like_epoch);
        self.spawn(async move {
            let _turn = lock.lock().await;
            let result = store.toggle_like(&track_id, &user_id).await;
            Completion::LikeToggled { track_id, result }
        });
        Ok(())
    }

    /// Jump to `fraction` of the current track. Ignored while the length is unknown.
    pub fn seek(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        if let Some(total) = self.seekable_length() {
            self.media.seek_to(total.mul_f64(fraction));
        }
    }

    /// Jump to an absolute position, clamped to the track length.
    pub fn seek_to(&mut self, position: Duration) {
        if let Some(total) = self.seekable_length() {
            self.media.seek_to(position.min(total));
        }
    }

    fn seekable_length(&self) -> Option<Duration> {
        let total = self.media.duration().filter(|d| !d.is_zero());
        if total.is_none() {
            log::debug!("seek ignored: duration unknown");
        }
        total
    }

    /// `percent` is clamped to 100.
    pub fn set_volume(&mut self, percent: u8) {
        self.volume = f32::from(percent.min(100)) / 100.0;
        self.media.set_volume(self.volume);
    }

    pub fn search(&mut self, query: &str, now: Instant) {
        self.search.input(query, now);
    }

    /// Issue the debounced query if its quiet period has elapsed.
    pub fn poll_search(&mut self, now: Instant) {
        let Some((seq, query)) = self.search.take_due(now) else {
            return;
        };
        log::debug!("searching for {query:?} (#{seq})");
        let store = Rc::clone(&self.store);
        self.spawn(async move {
            let result = store.search_tracks(&query).await;
            Completion::SearchResults { seq, query, result }
        });
    }

    pub fn search_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    pub fn share_link(&self, base: &str) -> Result<String, ControlError> {
        let id = self.current_id.as_deref().ok_or(ControlError::NoTrackSelected)?;
        deeplink::share_link(base, id).map_err(ControlError::InvalidLink)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Wait for the next settled store call. Pending forever when nothing is
    /// in flight, so guard with `has_pending` inside `select!`.
    pub async fn next_completion(&mut self) -> Completion {
        match self.pending.next().await {
            Some(c) => c,
            None => std::future::pending().await,
        }
    }

    /// Run every in-flight call, and whatever those trigger, to completion.
    pub async fn settle(&mut self) {
        while let Some(c) = self.pending.next().await {
            self.apply(c);
        }
    }

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::TracksLoaded(result) => self.on_tracks_loaded(result),
            Completion::DeepLinkFetched {
                id,
                generation,
                result,
            } => self.on_deep_link_fetched(id, generation, result),
            Completion::PlaysIncremented { id, result } => match result {
                Ok(()) => log::debug!("counted a play of {id}"),
                Err(e) => log::warn!("could not count a play of {id}: {e}"),
            },
            Completion::LikeChecked {
                generation,
                issued_at,
                track_id,
                result,
            } => match result {
                Ok(_) if self.toggled_since(&track_id, issued_at) => {
                    log::debug!("dropping like check on {track_id}: toggled since");
                }
                Ok(liked) => {
                    self.mirror_like(&track_id, liked);
                    if generation == self.generation {
                        self.like_button = Some(liked);
                    }
                }
                Err(e) => log::warn!("could not check like on {track_id}: {e}"),
            },
            Completion::LikeToggled { track_id, result } => match result {
                Ok(liked) => {
                    self.mirror_like(&track_id, liked);
                    // Every toggle flips the like exactly once, so the reply
                    // alone says which way the counter moved.
                    if let Some(t) = self.tracks.iter_mut().find(|t| t.id == track_id) {
                        t.likes = if liked {
                            t.likes.saturating_add(1)
                        } else {
                            t.likes.saturating_sub(1)
                        };
                    }
                    if self.current_id.as_deref() == Some(track_id.as_str()) {
                        self.like_button = Some(liked);
                    }
                }
                Err(e) => {
                    log::warn!("could not toggle like on {track_id}: {e}");
                    self.status = Some("Could not update like".to_string());
                }
            },
            Completion::SearchResults { seq, query, result } => {
                if !self.search.is_latest(seq) {
                    log::debug!("dropping stale results for {query:?}");
                    return;
                }
                let tracks = match result {
                    Ok(tracks) => tracks,
                    Err(e) => {
                        log::warn!("search for {query:?} failed, filtering locally: {e}");
                        catalog::search(&self.tracks, &query)
                    }
                };
                self.search.accept(seq, query, tracks);
            }
        }
    }

    fn toggled_since(&self, track_id: &str, epoch: u64) -> bool {
        self.last_toggle.get(track_id).is_some_and(|&t| t > epoch)
    }

    fn mirror_like(&mut self, track_id: &str, liked: bool) {
        if liked {
            self.liked.insert(track_id.to_string());
        } else {
            self.liked.remove(track_id);
        }
    }

    fn on_tracks_loaded(&mut self, result: Result<Vec<Track>, StoreError>) {
        let mut tracks = match result {
            Ok(tracks) => tracks,
            Err(e) if !self.loaded_once => {
                log::error!("initial track load failed: {e}");
                self.notice = Some(STORE_UNAVAILABLE_NOTICE.to_string());
                demo_tracks(chrono::Utc::now().timestamp_millis())
            }
            Err(e) => {
                log::warn!("refresh failed: {e}");
                self.status = Some("Refresh failed".to_string());
                return;
            }
        };
        self.loaded_once = true;
        catalog::sort_newest_first(&mut tracks);
        log::info!("loaded {} tracks", tracks.len());
        self.tracks = tracks;

        // Re-anchor the selection by id; the loaded media keeps playing either way.
        self.current = self
            .current_id
            .as_deref()
            .and_then(|id| self.tracks.iter().position(|t| t.id == id));

        if let Some(id) = self.deep_link.take() {
            self.resolve_deep_link(id);
        }
    }

    fn resolve_deep_link(&mut self, id: String) {
        if let Some(i) = self.index_of(&id) {
            let _ = self.select_track(i as isize);
            return;
        }
        log::info!("deep-linked track {id} not in the list, asking the store");
        let store = Rc::clone(&self.store);
        let generation = self.generation;
        self.spawn(async move {
            let result = store.get_track(&id).await;
            Completion::DeepLinkFetched {
                id,
                generation,
                result,
            }
        });
    }

    fn on_deep_link_fetched(
        &mut self,
        id: String,
        generation: u64,
        result: Result<Option<Track>, StoreError>,
    ) {
        let track = match result {
            Ok(Some(track)) => track,
            Ok(None) => {
                log::warn!("deep-linked track {id} does not exist");
                return;
            }
            Err(e) => {
                log::warn!("could not fetch deep-linked track {id}: {e}");
                return;
            }
        };

        let index = match self.index_of(&track.id) {
            Some(i) => i,
            None => {
                self.tracks.push(track);
                self.tracks.len() - 1
            }
        };
        if generation == self.generation {
            let _ = self.select_track(index as isize);
        } else {
            log::debug!("deep link {id} arrived after another selection; not switching");
        }
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Indices of `view`; `expanded` is the "show all" variant.
    pub fn view_indices(&self, view: View, expanded: bool) -> Vec<usize> {
        match view {
            View::Popular => {
                catalog::popular(&self.tracks, (!expanded).then_some(self.popular_limit))
            }
            View::New => catalog::newest(&self.tracks, (!expanded).then_some(self.new_limit)),
            View::All => catalog::all(&self.tracks),
        }
    }

    /// Rows of the latest search, or `None` when no query is active.
    pub fn search_rows(&self) -> Option<(&str, Vec<SearchRow<'_>>)> {
        let (query, results) = self.search.results()?;
        let rows = results
            .iter()
            .map(|track| SearchRow {
                index: self.index_of(&track.id),
                track,
            })
            .collect();
        Some((query, rows))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn volume_tier(&self) -> VolumeTier {
        VolumeTier::from_volume(self.volume)
    }

    pub fn like_button(&self) -> Option<bool> {
        self.like_button
    }

    pub fn is_liked(&self, track_id: &str) -> bool {
        self.liked.contains(track_id)
    }

    pub fn position(&self) -> Duration {
        self.media.position()
    }

    /// Media length, falling back to the length stored on the record.
    pub fn duration(&self) -> Option<Duration> {
        self.media.duration().filter(|d| !d.is_zero()).or_else(|| {
            self.current_track()
                .map(|t| Duration::from_millis(t.duration_ms))
                .filter(|d| !d.is_zero())
        })
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }
}
