use super::*;
use tokio::sync::mpsc;

fn make_track() -> Track {
    Track {
        id: "-Nx7.abc/9".to_string(),
        title: "Test Title".to_string(),
        artist: "Test Artist".to_string(),
        audio_url: "https://cdn.example.com/test.mp3".to_string(),
        image_url: None,
        genre: None,
        description: None,
        duration_ms: 1_234,
        plays: 0,
        likes: 0,
        timestamp: 0,
        uploader_id: String::new(),
    }
}

#[test]
fn set_track_sets_and_clears_shared_state() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let handle = MprisHandle {
        state: state.clone(),
    };

    handle.set_track(Some(&make_track()));
    {
        let s = state.lock().unwrap();
        assert_eq!(s.title.as_deref(), Some("Test Title"));
        assert_eq!(s.artist.as_deref(), Some("Test Artist"));
        assert_eq!(s.url.as_deref(), Some("https://cdn.example.com/test.mp3"));
        assert_eq!(s.length_micros, Some(1_234_000));
        assert_eq!(s.track_path.as_deref(), Some("/org/bahr/track/_Nx7_abc_9"));
    }

    handle.set_track(None);
    {
        let s = state.lock().unwrap();
        assert_eq!(s.title, None);
        assert_eq!(s.artist, None);
        assert_eq!(s.url, None);
        assert_eq!(s.length_micros, None);
        assert!(s.track_path.is_none());
    }
}

#[test]
fn unknown_length_is_left_out() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let handle = MprisHandle {
        state: state.clone(),
    };
    let mut track = make_track();
    track.duration_ms = 0;
    handle.set_track(Some(&track));
    assert_eq!(state.lock().unwrap().length_micros, None);
}

#[test]
fn track_paths_are_valid_object_paths() {
    for id in ["abc", "-N.x$y#z[0]/1", ""] {
        let path = track_object_path(id);
        assert!(ObjectPath::try_from(path.as_str()).is_ok(), "{path}");
    }
}

#[test]
fn playback_status_maps_state_to_mpris_strings() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (tx, _rx) = mpsc::unbounded_channel::<ControlCmd>();
    let iface = PlayerIface {
        tx,
        state: state.clone(),
    };

    let cases = [
        (PlaybackState::Idle, "Stopped"),
        (PlaybackState::Loading, "Paused"),
        (PlaybackState::Playing, "Playing"),
        (PlaybackState::Paused, "Paused"),
        (PlaybackState::Ended, "Stopped"),
    ];
    for (playback, expected) in cases {
        state.lock().unwrap().playback = playback;
        assert_eq!(iface.playback_status(), expected);
    }
}

#[test]
fn metadata_exposes_title_artist_and_length() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (tx, _rx) = mpsc::unbounded_channel::<ControlCmd>();
    let handle = MprisHandle {
        state: state.clone(),
    };
    handle.set_track(Some(&make_track()));
    let iface = PlayerIface { tx, state };

    let map = iface.metadata();
    assert!(map.contains_key("mpris:trackid"));
    assert!(map.contains_key("xesam:title"));
    assert!(map.contains_key("xesam:artist"));
    assert!(map.contains_key("xesam:url"));
    assert!(map.contains_key("mpris:length"));
}

#[test]
fn transport_methods_forward_commands() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (tx, mut rx) = mpsc::unbounded_channel::<ControlCmd>();
    let iface = PlayerIface { tx, state };

    iface.play_pause();
    iface.next();
    iface.previous();
    iface.stop();
    assert_eq!(rx.try_recv().unwrap(), ControlCmd::PlayPause);
    assert_eq!(rx.try_recv().unwrap(), ControlCmd::Next);
    assert_eq!(rx.try_recv().unwrap(), ControlCmd::Prev);
    assert_eq!(rx.try_recv().unwrap(), ControlCmd::Pause);
}

#[test]
fn seeking_is_relative_to_the_published_position() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let handle = MprisHandle {
        state: state.clone(),
    };
    let (tx, mut rx) = mpsc::unbounded_channel::<ControlCmd>();
    let iface = PlayerIface { tx, state };

    // Nothing selected yet.
    iface.seek(5_000_000);
    assert!(rx.try_recv().is_err());

    handle.set_track(Some(&make_track()));
    handle.set_progress(Duration::from_secs(10), 0.5);
    assert_eq!(iface.position(), 10_000_000);
    assert_eq!(iface.volume(), 0.5);

    iface.seek(5_000_000);
    iface.seek(-60_000_000);
    assert_eq!(
        rx.try_recv().unwrap(),
        ControlCmd::SeekTo(Duration::from_secs(15))
    );
    assert_eq!(rx.try_recv().unwrap(), ControlCmd::SeekTo(Duration::ZERO));
}

#[test]
fn set_position_checks_track_and_bounds() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let handle = MprisHandle {
        state: state.clone(),
    };
    handle.set_track(Some(&make_track()));
    let (tx, mut rx) = mpsc::unbounded_channel::<ControlCmd>();
    let iface = PlayerIface { tx, state };

    let current = track_object_path(&make_track().id);
    let current = ObjectPath::try_from(current.as_str()).unwrap();
    let other = ObjectPath::try_from("/org/bahr/track/other").unwrap();

    iface.set_position(other, 1_000);
    iface.set_position(current.clone(), -1);
    iface.set_position(current.clone(), 2_000_000);
    assert!(rx.try_recv().is_err());

    iface.set_position(current, 1_000_000);
    assert_eq!(
        rx.try_recv().unwrap(),
        ControlCmd::SeekTo(Duration::from_secs(1))
    );
}
