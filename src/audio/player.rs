use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, MediaElement, MediaEvent, MediaHandle, MediaInfo, PlaybackError};

pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    info: MediaHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new(events: UnboundedSender<MediaEvent>) -> Self {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let info: MediaHandle = Arc::new(Mutex::new(MediaInfo::default()));

        let audio_handle = spawn_audio_thread(rx, events, info.clone());

        Self {
            tx,
            info,
            join: Mutex::new(Some(audio_handle)),
        }
    }

    fn send(&self, cmd: AudioCmd) -> Result<(), mpsc::SendError<AudioCmd>> {
        self.tx.send(cmd)
    }

    fn snapshot(&self) -> MediaInfo {
        self.info.lock().map(|i| i.clone()).unwrap_or_default()
    }

    pub fn quit_softly(&self, fade_out: Duration) {
        if let Ok(mut i) = self.info.lock() {
            i.quitting = true;
        }
        let _ = self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl MediaElement for AudioPlayer {
    fn load(&mut self, url: &str, token: u64) {
        if let Ok(mut i) = self.info.lock() {
            *i = MediaInfo {
                token,
                ..MediaInfo::default()
            };
        }
        if self
            .send(AudioCmd::Load {
                url: url.to_string(),
                token,
            })
            .is_err()
        {
            log::error!("audio thread is gone; cannot load {url}");
        }
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if !self.snapshot().loaded {
            return Err(PlaybackError::NotLoaded);
        }
        self.send(AudioCmd::Play)
            .map_err(|e| PlaybackError::Rejected(e.to_string()))
    }

    fn pause(&mut self) {
        let _ = self.send(AudioCmd::Pause);
    }

    fn seek_to(&mut self, position: Duration) {
        let _ = self.send(AudioCmd::SeekTo(position));
    }

    fn set_volume(&mut self, volume: f32) {
        let _ = self.send(AudioCmd::SetVolume(volume.clamp(0.0, 1.0)));
    }

    fn duration(&self) -> Option<Duration> {
        self.snapshot().duration
    }

    fn position(&self) -> Duration {
        self.snapshot().elapsed
    }
}
