use super::load::{default_config_path, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn config_path_resolution_order() {
    use std::path::PathBuf;

    let _lock = env_lock();
    let _home = EnvGuard::set("HOME", "/tmp/home-dir");
    let _path = EnvGuard::remove("BAHR_CONFIG_PATH");

    {
        let _xdg = EnvGuard::remove("XDG_CONFIG_HOME");
        assert_eq!(
            resolve_config_path(),
            Some(PathBuf::from("/tmp/home-dir/.config/bahr/config.toml"))
        );
    }
    {
        let _xdg = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg");
        assert_eq!(
            default_config_path(),
            Some(PathBuf::from("/tmp/xdg/bahr/config.toml"))
        );

        let _explicit = EnvGuard::set("BAHR_CONFIG_PATH", "/etc/bahr.toml");
        assert_eq!(resolve_config_path(), Some(PathBuf::from("/etc/bahr.toml")));
    }
}

#[test]
fn defaults_are_valid_and_use_the_demo_store() {
    let s = Settings::default();
    assert!(s.validate().is_ok());
    assert!(s.store.database_url.is_none());
    assert_eq!(s.player.search_debounce_ms, 300);
    assert_eq!(s.player.popular_limit, 8);
    assert_eq!(s.player.new_limit, 8);
    assert_eq!(s.upload.max_file_mb, 50);
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[store]
database_url = "https://tunes-default-rtdb.example.com"
auth_token = "secret"
timeout_secs = 4

[upload]
api_origin = "https://files.example.com"
max_file_mb = 20

[player]
volume = 35
search_debounce_ms = 450
popular_limit = 5
new_limit = 3

[audio]
quit_fade_out_ms = 123

[site]
share_base_url = "https://tunes.example.com/player.html"

[ui]
header_text = "hello"

[identity]
path = "/tmp/bahr-id"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("BAHR_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("BAHR__PLAYER__VOLUME");

    let s = Settings::load().unwrap();
    assert_eq!(
        s.store.database_url.as_deref(),
        Some("https://tunes-default-rtdb.example.com")
    );
    assert_eq!(s.store.auth_token.as_deref(), Some("secret"));
    assert_eq!(s.store.timeout_secs, 4);
    assert_eq!(s.upload.api_origin, "https://files.example.com");
    assert_eq!(s.upload.max_file_mb, 20);
    assert_eq!(s.player.volume, 35);
    assert_eq!(s.player.search_debounce_ms, 450);
    assert_eq!(s.player.popular_limit, 5);
    assert_eq!(s.player.new_limit, 3);
    assert_eq!(s.audio.quit_fade_out_ms, 123);
    assert_eq!(s.site.share_base_url, "https://tunes.example.com/player.html");
    assert_eq!(s.ui.header_text, "hello");
    assert_eq!(
        s.identity.path,
        Some(std::path::PathBuf::from("/tmp/bahr-id"))
    );
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[player]
volume = 80
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("BAHR_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("BAHR__PLAYER__VOLUME", "10");

    let s = Settings::load().unwrap();
    assert_eq!(s.player.volume, 10);
}

#[test]
fn validate_rejects_short_debounce() {
    let mut s = Settings::default();
    s.player.search_debounce_ms = 100;
    let err = s.validate().unwrap_err();
    assert!(err.contains("search_debounce_ms"));
}

#[test]
fn validate_rejects_loud_volume_and_odd_database_urls() {
    let mut s = Settings::default();
    s.player.volume = 101;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.store.database_url = Some("ftp://nope".to_string());
    assert!(s.validate().is_err());
}

#[test]
fn effective_settings_render_as_toml() {
    let mut s = Settings::default();
    s.store.database_url = Some("https://db.example.com".to_string());
    let text = s.to_toml().unwrap();
    assert!(text.contains("[player]"));
    assert!(text.contains("search_debounce_ms = 300"));
    assert!(text.contains("database_url = \"https://db.example.com\""));
}

#[test]
fn validate_reports_every_problem() {
    let mut s = Settings::default();
    s.player.volume = 150;
    s.upload.max_file_mb = 0;
    s.upload.api_origin = "files.example.com".to_string();
    let err = s.validate().unwrap_err();
    assert!(err.contains("player.volume"), "{err}");
    assert!(err.contains("upload.max_file_mb"), "{err}");
    assert!(err.contains("upload.api_origin"), "{err}");
}

#[test]
fn redacted_masks_the_auth_token_only() {
    let mut s = Settings::default();
    assert_eq!(s.redacted().store.auth_token, None);

    s.store.auth_token = Some("secret".to_string());
    s.store.database_url = Some("https://db.example.com".to_string());
    let shown = s.redacted();
    assert_eq!(shown.store.auth_token.as_deref(), Some("<redacted>"));
    assert_eq!(shown.store.database_url, s.store.database_url);
    assert!(!shown.to_toml().unwrap().contains("secret"));
}

#[test]
fn missing_config_file_gives_defaults() {
    let _lock = env_lock();
    let _g = EnvGuard::remove("BAHR__PLAYER__VOLUME");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let s = Settings::load_from(Some(path.as_path())).unwrap();
    assert_eq!(s.player.volume, 80);
    assert!(s.store.database_url.is_none());
}
