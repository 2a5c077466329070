//! Local listener identity.
//!
//! A random opaque id is generated once per profile and kept in a small file.
//! It only partitions likes; it is never authenticated.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const ID_FILE: &str = "user_id";
const SUFFIX_LEN: usize = 9;

/// Return the id stored at `path`, creating and persisting a new one when the
/// file is missing or blank.
pub fn load_or_create(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(existing) if !existing.trim().is_empty() => return Ok(existing.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let id = generate(chrono::Utc::now().timestamp_millis());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &id)?;
    log::info!("created listener id {id} at {}", path.display());
    Ok(id)
}

/// `user_<millis>_<9 base36 chars>`
pub fn generate(now_ms: i64) -> String {
    let mut n: u64 = rand::random();
    let mut suffix = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        let digit = (n % 36) as u32;
        suffix.push(char::from_digit(digit, 36).unwrap_or('0'));
        n /= 36;
    }
    format!("user_{now_ms}_{suffix}")
}

/// `$XDG_DATA_HOME/bahr/user_id`, or `~/.local/share/bahr/user_id`.
pub fn default_path() -> Option<PathBuf> {
    let data_home = if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
    };

    data_home.map(|d| d.join("bahr").join(ID_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generate_has_prefix_timestamp_and_base36_suffix() {
        let id = generate(1_700_000_000_000);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert_eq!(parts[1], "1700000000000");
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn load_or_create_persists_and_reuses_the_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("user_id");

        let first = load_or_create(&path).unwrap();
        let second = load_or_create(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn load_or_create_keeps_an_existing_id_and_trims_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user_id");
        fs::write(&path, "user_1_abc\n").unwrap();
        assert_eq!(load_or_create(&path).unwrap(), "user_1_abc");
    }

    #[test]
    fn load_or_create_replaces_a_blank_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user_id");
        fs::write(&path, "   ").unwrap();
        let id = load_or_create(&path).unwrap();
        assert!(id.starts_with("user_"));
    }
}
