//! Desktop media keys over D-Bus (MPRIS).
//!
//! The service runs on its own thread. Method calls become `ControlCmd`s for
//! the event loop; the properties read a snapshot the event loop publishes
//! through `MprisHandle`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use tokio::sync::mpsc::UnboundedSender;
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedValue, Value};

use crate::app::PlaybackState;
use crate::catalog::Track;

const BUS_NAME: &str = "org.mpris.MediaPlayer2.bahr";
const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const TRACK_PATH_PREFIX: &str = "/org/bahr/track/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Next,
    Prev,
    /// Absolute position in the current track.
    SeekTo(Duration),
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlaybackState,
    title: Option<String>,
    artist: Option<String>,
    url: Option<String>,
    length_micros: Option<i64>,
    track_path: Option<String>,
    position_micros: i64,
    volume: f64,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
}

impl MprisHandle {
    pub fn set_playback(&self, playback: PlaybackState) {
        if let Ok(mut s) = self.state.lock() {
            s.playback = playback;
        }
    }

    pub fn set_progress(&self, position: Duration, volume: f32) {
        if let Ok(mut s) = self.state.lock() {
            s.position_micros = i64::try_from(position.as_micros()).unwrap_or(i64::MAX);
            s.volume = f64::from(volume);
        }
    }

    pub fn set_track(&self, track: Option<&Track>) {
        let Ok(mut s) = self.state.lock() else {
            return;
        };
        match track {
            Some(t) => {
                s.title = Some(t.title.clone()).filter(|v| !v.is_empty());
                s.artist = Some(t.artist.clone()).filter(|v| !v.is_empty());
                s.url = Some(t.audio_url.clone()).filter(|v| !v.is_empty());
                s.length_micros = (t.duration_ms > 0)
                    .then(|| i64::try_from(t.duration_ms.saturating_mul(1000)).unwrap_or(i64::MAX));
                s.track_path = Some(track_object_path(&t.id));
            }
            None => {
                s.title = None;
                s.artist = None;
                s.url = None;
                s.length_micros = None;
                s.track_path = None;
            }
        }
    }
}

/// D-Bus object paths only allow `[A-Za-z0-9_]` per element.
fn track_object_path(id: &str) -> String {
    let element: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let element = if element.is_empty() {
        "none".to_string()
    } else {
        element
    };
    format!("{TRACK_PATH_PREFIX}{element}")
}

fn status_str(playback: PlaybackState) -> &'static str {
    match playback {
        PlaybackState::Playing => "Playing",
        PlaybackState::Loading | PlaybackState::Paused => "Paused",
        PlaybackState::Idle | PlaybackState::Ended => "Stopped",
    }
}

fn from_micros(micros: i64) -> Duration {
    Duration::from_micros(u64::try_from(micros).unwrap_or(0))
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

struct RootIface {
    tx: UnboundedSender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "bahr"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["http".to_string(), "https".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: UnboundedSender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    /// There is no stopped transport; stopping pauses.
    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    /// `offset` is relative to the current position, in microseconds.
    fn seek(&self, offset: i64) {
        let Ok(s) = self.state.lock() else {
            return;
        };
        if s.track_path.is_none() {
            return;
        }
        let target = s.position_micros.saturating_add(offset).max(0);
        let _ = self.tx.send(ControlCmd::SeekTo(from_micros(target)));
    }

    /// Ignored unless `track_id` is the current track and `position` lies
    /// within it.
    fn set_position(&self, track_id: ObjectPath<'_>, position: i64) {
        let Ok(s) = self.state.lock() else {
            return;
        };
        if s.track_path.as_deref() != Some(track_id.as_str()) || position < 0 {
            return;
        }
        if s.length_micros.is_some_and(|len| position > len) {
            return;
        }
        let _ = self.tx.send(ControlCmd::SeekTo(from_micros(position)));
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        status_str(s.playback)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn volume(&self) -> f64 {
        self.state.lock().map(|s| s.volume).unwrap_or(0.0)
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let mut put = |key: &str, value: Option<OwnedValue>| {
            if let Some(v) = value {
                map.insert(key.to_string(), v);
            }
        };

        let track_path = s
            .track_path
            .as_deref()
            .and_then(|p| ObjectPath::try_from(p).ok());
        put("mpris:trackid", track_path.and_then(|p| owned(Value::from(p))));
        put(
            "xesam:title",
            owned(Value::from(s.title.clone().unwrap_or_default())),
        );
        put(
            "xesam:artist",
            s.artist.clone().and_then(|a| owned(Value::from(vec![a]))),
        );
        put("xesam:url", s.url.clone().and_then(|u| owned(Value::from(u))));
        put("mpris:length", s.length_micros.and_then(|l| owned(Value::from(l))));
        map
    }
}

/// Register the MPRIS service on the session bus. A missing bus is logged
/// and otherwise ignored.
pub fn spawn_mpris(tx: UnboundedSender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        block_on(async move {
            let connection = match Connection::session().await {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("MPRIS: failed to connect to session bus: {e}");
                    return;
                }
            };

            if let Err(e) = connection.request_name(BUS_NAME).await {
                log::warn!("MPRIS: failed to acquire name: {e}");
                return;
            }

            let object_server = connection.object_server();

            if let Err(e) = object_server
                .at(OBJECT_PATH, RootIface { tx: tx.clone() })
                .await
            {
                log::warn!("MPRIS: failed to register root iface: {e}");
                return;
            }

            if let Err(e) = object_server
                .at(
                    OBJECT_PATH,
                    PlayerIface {
                        tx,
                        state: state_for_thread,
                    },
                )
                .await
            {
                log::warn!("MPRIS: failed to register player iface: {e}");
                return;
            }
            log::info!("MPRIS: registered {BUS_NAME}");

            // Keep the service alive.
            loop {
                Timer::after(std::time::Duration::from_secs(3600)).await;
            }
        });
    });

    MprisHandle { state }
}

#[cfg(test)]
mod tests;
