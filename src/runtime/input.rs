use std::thread;

use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEventKind};
use tokio::sync::mpsc::UnboundedSender;

/// Forward key presses, left clicks and resizes from a blocking reader thread.
/// The thread ends when the receiver is dropped or the terminal errors.
pub fn spawn_input_reader(tx: UnboundedSender<Event>) {
    thread::spawn(move || {
        loop {
            let ev = match event::read() {
                Ok(ev) => ev,
                Err(e) => {
                    log::error!("terminal input failed: {e}");
                    return;
                }
            };
            let wanted = match &ev {
                Event::Key(key) => key.kind == KeyEventKind::Press,
                Event::Mouse(m) => matches!(m.kind, MouseEventKind::Down(MouseButton::Left)),
                Event::Resize(..) => true,
                _ => false,
            };
            if wanted && tx.send(ev).is_err() {
                return;
            }
        }
    });
}
