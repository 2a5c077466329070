use std::error::Error;
use std::io::Stdout;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use ratatui::layout::Rect;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{MissedTickBehavior, sleep_until};

use crate::app::{Browser, Controller, Popup};
use crate::audio::{AudioPlayer, MediaEvent};
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::mpris_sync::MprisSync;
use crate::store::TrackStore;
use crate::ui;

/// Redraw cadence; also refreshes the position readout while playing.
const TICK: Duration = Duration::from_millis(250);
const VOLUME_STEP: i32 = 10;

/// Receivers fed by the helper threads.
pub struct Channels {
    pub input: UnboundedReceiver<Event>,
    pub control: UnboundedReceiver<ControlCmd>,
    pub media: UnboundedReceiver<MediaEvent>,
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Main terminal event loop. Returns `Ok(())` when shutdown is requested.
pub async fn run<S: TrackStore + 'static>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    settings: &config::Settings,
    ctrl: &mut Controller<S, AudioPlayer>,
    mpris: &MprisHandle,
    channels: &mut Channels,
    source: &str,
) -> Result<(), Box<dyn Error>> {
    let mut browser = Browser::default();
    let mut sync = MprisSync::default();
    let mut tick = tokio::time::interval(TICK);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let len = browser.rows(ctrl).len();
        browser.clamp_cursor(len);
        sync.update(mpris, ctrl);

        let screen = terminal
            .draw(|f| ui::draw(f, ctrl, &browser, settings, source))?
            .area;

        let search_due = ctrl.search_deadline();
        let wake_at = tokio::time::Instant::from_std(search_due.unwrap_or_else(Instant::now));

        let flow = tokio::select! {
            Some(ev) = channels.input.recv() => handle_event(ev, screen, settings, ctrl, &mut browser),
            Some(cmd) = channels.control.recv() => handle_control_cmd(cmd, ctrl),
            Some(ev) = channels.media.recv() => {
                ctrl.on_media_event(ev);
                Flow::Continue
            }
            completion = ctrl.next_completion(), if ctrl.has_pending() => {
                ctrl.apply(completion);
                Flow::Continue
            }
            _ = sleep_until(wake_at), if search_due.is_some() => {
                ctrl.poll_search(Instant::now());
                Flow::Continue
            }
            _ = tick.tick() => Flow::Continue,
        };

        if flow == Flow::Quit {
            ctrl.media()
                .quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return Ok(());
        }
    }
}

fn handle_control_cmd<S: TrackStore + 'static>(
    cmd: ControlCmd,
    ctrl: &mut Controller<S, AudioPlayer>,
) -> Flow {
    match cmd {
        ControlCmd::Quit => return Flow::Quit,
        ControlCmd::Play => ctrl.play(),
        ControlCmd::Pause => ctrl.pause(),
        ControlCmd::PlayPause => ctrl.toggle_play(),
        ControlCmd::Next => ctrl.next(),
        ControlCmd::Prev => ctrl.previous(),
        ControlCmd::SeekTo(position) => ctrl.seek_to(position),
    }
    Flow::Continue
}

fn handle_event<S: TrackStore + 'static>(
    ev: Event,
    screen: Rect,
    settings: &config::Settings,
    ctrl: &mut Controller<S, AudioPlayer>,
    browser: &mut Browser,
) -> Flow {
    match ev {
        Event::Key(key) => handle_key_event(key, settings, ctrl, browser),
        Event::Mouse(mouse) => {
            handle_click(mouse, screen, ctrl);
            Flow::Continue
        }
        _ => Flow::Continue,
    }
}

fn handle_click<S: TrackStore + 'static>(
    mouse: MouseEvent,
    screen: Rect,
    ctrl: &mut Controller<S, AudioPlayer>,
) {
    if let Some(fraction) = ui::progress_fraction(screen, mouse.column, mouse.row) {
        ctrl.seek(fraction);
    }
}

fn handle_key_event<S: TrackStore + 'static>(
    key: KeyEvent,
    settings: &config::Settings,
    ctrl: &mut Controller<S, AudioPlayer>,
    browser: &mut Browser,
) -> Flow {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Flow::Quit;
    }

    // The startup notice swallows the first key.
    if ctrl.notice().is_some() {
        ctrl.dismiss_notice();
        return Flow::Continue;
    }

    if browser.typing {
        handle_search_key(key, ctrl, browser);
        return Flow::Continue;
    }

    match key.code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Esc => {
            if browser.popup.take().is_none() && browser.searching() {
                browser.clear_search();
                ctrl.search("", Instant::now());
            }
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let len = browser.rows(ctrl).len();
            browser.move_cursor(1, len);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            let len = browser.rows(ctrl).len();
            browser.move_cursor(-1, len);
        }
        KeyCode::Enter => play_highlighted(ctrl, browser),
        KeyCode::Char(' ') | KeyCode::Char('p') => ctrl.toggle_play(),
        KeyCode::Right | KeyCode::Char('l') => ctrl.next(),
        KeyCode::Left | KeyCode::Char('h') => ctrl.previous(),
        KeyCode::Tab => browser.set_view(browser.view.next()),
        KeyCode::Char('a') => browser.toggle_expanded(),
        KeyCode::Char('f') => {
            if let Err(e) = ctrl.toggle_like() {
                ctrl.set_status(e.to_string());
            }
        }
        KeyCode::Char('/') => {
            browser.typing = true;
            browser.popup = None;
        }
        KeyCode::Char(c @ '0'..='9') => {
            let tenth = c.to_digit(10).unwrap_or(0);
            ctrl.seek(f64::from(tenth) / 10.0);
        }
        KeyCode::Char('+') | KeyCode::Char('=') => step_volume(ctrl, VOLUME_STEP),
        KeyCode::Char('-') => step_volume(ctrl, -VOLUME_STEP),
        KeyCode::Char('s') => match ctrl.share_link(&settings.site.share_base_url) {
            Ok(link) => {
                log::info!("share link: {link}");
                browser.toggle_popup(Popup::Share(link));
            }
            Err(e) => ctrl.set_status(e.to_string()),
        },
        KeyCode::Char('K') => browser.toggle_popup(Popup::Details),
        KeyCode::Char('r') => ctrl.refresh(),
        _ => {}
    }
    Flow::Continue
}

fn handle_search_key<S: TrackStore + 'static>(
    key: KeyEvent,
    ctrl: &mut Controller<S, AudioPlayer>,
    browser: &mut Browser,
) {
    let now = Instant::now();
    match key.code {
        KeyCode::Esc => {
            browser.clear_search();
            ctrl.search("", now);
        }
        KeyCode::Enter => browser.typing = false,
        KeyCode::Backspace => {
            browser.pop_char();
            ctrl.search(&browser.query, now);
        }
        KeyCode::Down => {
            let len = browser.rows(ctrl).len();
            browser.move_cursor(1, len);
        }
        KeyCode::Up => {
            let len = browser.rows(ctrl).len();
            browser.move_cursor(-1, len);
        }
        KeyCode::Char(c) => {
            browser.push_char(c);
            ctrl.search(&browser.query, now);
        }
        _ => {}
    }
}

fn play_highlighted<S: TrackStore + 'static>(
    ctrl: &mut Controller<S, AudioPlayer>,
    browser: &Browser,
) {
    let target = browser.rows(ctrl).get(browser.cursor).map(|row| row.index);
    match target {
        Some(Some(index)) => {
            if let Err(e) = ctrl.select_track(index as isize) {
                ctrl.set_status(e.to_string());
            }
        }
        Some(None) => ctrl.set_status("Not in the loaded list yet; press r to refresh"),
        None => {}
    }
}

fn step_volume<S: TrackStore + 'static>(ctrl: &mut Controller<S, AudioPlayer>, delta: i32) {
    let percent = (ctrl.volume() * 100.0).round() as i32 + delta;
    ctrl.set_volume(percent.clamp(0, 100) as u8);
}
