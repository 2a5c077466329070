use crate::app::{Controller, PlaybackState};
use crate::audio::MediaElement;
use crate::mpris::MprisHandle;
use crate::store::TrackStore;

/// Last values pushed to MPRIS; track and state are only rewritten when they
/// change. Position and volume are polled by clients and always refreshed.
#[derive(Default)]
pub struct MprisSync {
    track_id: Option<String>,
    playback: PlaybackState,
}

impl MprisSync {
    pub fn update<S: TrackStore + 'static, M: MediaElement>(
        &mut self,
        mpris: &MprisHandle,
        ctrl: &Controller<S, M>,
    ) {
        let id = ctrl.current_id();
        if id != self.track_id.as_deref() {
            mpris.set_track(ctrl.current_track());
            self.track_id = id.map(str::to_string);
        }
        mpris.set_progress(ctrl.position(), ctrl.volume());
        if ctrl.state() != self.playback {
            mpris.set_playback(ctrl.state());
            self.playback = ctrl.state();
        }
    }
}
