use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tokio::sync::mpsc::UnboundedSender;

use super::sink::{FetchError, MediaBytes, create_sink_at, fetch, decoded_duration};
use super::types::{AudioCmd, MediaEvent, MediaHandle};

/// State of the source currently parked in the output stream.
struct Loaded {
    token: u64,
    bytes: MediaBytes,
    sink: Sink,
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    events: UnboundedSender<MediaEvent>,
    info: MediaHandle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut s) => {
                // rodio logs to stderr when OutputStream is dropped; that would
                // scribble over the TUI.
                s.log_on_drop(false);
                Some(s)
            }
            Err(e) => {
                log::error!("no audio output device: {e}");
                None
            }
        };
        let http = reqwest::blocking::Client::new();

        let mut current: Option<Loaded> = None;
        let mut volume: f32 = 1.0;
        let mut paused = true;

        // Track start time and accumulated elapsed when paused.
        let mut started_at: Option<Instant> = None;
        let mut accumulated = Duration::ZERO;

        loop {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(cmd) => match cmd {
                    AudioCmd::Load { url, token } => {
                        // A newer load is already queued behind this one.
                        if superseded(&info, token) {
                            log::debug!("skipping superseded load of {url} (token {token})");
                            continue;
                        }
                        if let Some(old) = current.take() {
                            old.sink.stop();
                        }
                        paused = true;
                        started_at = None;
                        accumulated = Duration::ZERO;

                        let result = stream
                            .as_ref()
                            .ok_or_else(|| FetchError::Failed("no audio output device".into()))
                            .and_then(|stream| {
                                load_source(stream, &http, &url, volume, || {
                                    superseded(&info, token)
                                })
                            });
                        match result {
                            Ok((bytes, sink)) => {
                                let duration = decoded_duration(&bytes);
                                log::debug!("loaded {url} (token {token}, {duration:?})");
                                current = Some(Loaded { token, bytes, sink });
                                if let Ok(mut i) = info.lock() {
                                    if i.token == token {
                                        i.loaded = true;
                                        i.duration = duration;
                                        i.elapsed = Duration::ZERO;
                                        i.playing = false;
                                    }
                                }
                                let _ = events.send(MediaEvent::Ready { token, duration });
                            }
                            Err(FetchError::Abandoned) => {
                                log::debug!("abandoned load of {url} (token {token})");
                            }
                            Err(FetchError::Failed(reason)) => {
                                log::warn!("failed to load {url}: {reason}");
                                let _ = events.send(MediaEvent::Failed { token, reason });
                            }
                        }
                    }

                    AudioCmd::Play => {
                        if let Some(ref c) = current {
                            if paused {
                                c.sink.play();
                                paused = false;
                                started_at = Some(Instant::now());
                            }
                            set_playing(&info, c.token, true);
                        }
                    }

                    AudioCmd::Pause => {
                        if let Some(ref c) = current {
                            if !paused {
                                c.sink.pause();
                                if let Some(st) = started_at.take() {
                                    accumulated += st.elapsed();
                                }
                                paused = true;
                            }
                            set_playing(&info, c.token, false);
                        }
                    }

                    AudioCmd::SeekTo(position) => {
                        // Rebuild the sink from the cached bytes and skip into the stream.
                        let (Some(c), Some(stream)) = (current.as_mut(), stream.as_ref()) else {
                            continue;
                        };
                        match create_sink_at(stream, &c.bytes, position, volume) {
                            Ok(new_sink) => {
                                c.sink.stop();
                                if paused {
                                    started_at = None;
                                } else {
                                    new_sink.play();
                                    started_at = Some(Instant::now());
                                }
                                c.sink = new_sink;
                                accumulated = position;
                                if let Ok(mut i) = info.lock() {
                                    if i.token == c.token {
                                        i.elapsed = position;
                                    }
                                }
                            }
                            Err(e) => log::warn!("seek failed: {e}"),
                        }
                    }

                    AudioCmd::SetVolume(v) => {
                        volume = v.clamp(0.0, 1.0);
                        if let Some(ref c) = current {
                            c.sink.set_volume(volume);
                        }
                    }

                    AudioCmd::Quit { fade_out_ms } => {
                        if let Some(ref c) = current {
                            if !paused {
                                fade_out_sink(&c.sink, volume, fade_out_ms);
                            }
                            c.sink.stop();
                            set_playing(&info, c.token, false);
                        }
                        break;
                    }
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            // Publish elapsed time and detect the natural end of the source.
            let Some(ref c) = current else {
                continue;
            };
            if paused {
                continue;
            }
            let elapsed = accumulated + started_at.map_or(Duration::ZERO, |st| st.elapsed());
            if let Ok(mut i) = info.lock() {
                if i.token == c.token {
                    i.elapsed = elapsed;
                }
            }
            if c.sink.empty() {
                let token = c.token;
                paused = true;
                started_at = None;
                accumulated = Duration::ZERO;
                set_playing(&info, token, false);
                let _ = events.send(MediaEvent::Ended { token });
                current = None;
            }
        }
    })
}

fn load_source(
    stream: &OutputStream,
    http: &reqwest::blocking::Client,
    url: &str,
    volume: f32,
    abandon: impl Fn() -> bool,
) -> Result<(MediaBytes, Sink), FetchError> {
    let bytes = fetch(http, url, abandon)?;
    let sink =
        create_sink_at(stream, &bytes, Duration::ZERO, volume).map_err(FetchError::Failed)?;
    Ok((bytes, sink))
}

/// True once `token` is no longer the newest load or shutdown was requested.
pub(super) fn superseded(info: &MediaHandle, token: u64) -> bool {
    info.lock()
        .map(|i| i.token != token || i.quitting)
        .unwrap_or(false)
}

fn set_playing(info: &MediaHandle, token: u64, playing: bool) {
    if let Ok(mut i) = info.lock() {
        if i.token == token {
            i.playing = playing;
        }
    }
}

fn fade_out_sink(sink: &Sink, from: f32, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(from * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
