use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use env_logger::{Builder, Env, Target};

/// Log to a file under the state directory so records never land on the
/// alternate screen. Falls back to no logging when the file cannot be opened.
pub fn init_for_tui() {
    let Some(path) = log_path() else {
        return;
    };
    if let Some(dir) = path.parent() {
        if fs::create_dir_all(dir).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let _ = builder().target(Target::Pipe(Box::new(file))).try_init();
}

/// One-shot commands log to stderr.
pub fn init_for_cli() {
    let _ = builder().target(Target::Stderr).try_init();
}

fn builder() -> Builder {
    Builder::from_env(Env::default().default_filter_or("info"))
}

fn log_path() -> Option<PathBuf> {
    let state = std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/state")))?;
    Some(state.join("bahr").join("bahr.log"))
}
