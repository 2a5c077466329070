use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/bahr/config.toml` or `~/.config/bahr/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `BAHR__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub upload: UploadSettings,
    pub player: PlayerSettings,
    pub audio: AudioSettings,
    pub site: SiteSettings,
    pub ui: UiSettings,
    pub identity: IdentitySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Root of the realtime database, e.g. `https://example-rtdb.firebaseio.com`.
    /// Leave unset to browse the built-in demo catalogue.
    pub database_url: Option<String>,
    /// Database secret or ID token, sent as the `auth` query parameter.
    pub auth_token: Option<String>,
    /// Per-request timeout (seconds).
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            auth_token: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Origin of the file host exposing `POST /api/upload`.
    pub api_origin: String,
    /// Largest file accepted for upload (MiB).
    pub max_file_mb: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            api_origin: "http://localhost:3000".to_string(),
            max_file_mb: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Initial volume, 0-100.
    pub volume: u8,
    /// Quiet period before a typed search query is sent (milliseconds, >= 300).
    pub search_debounce_ms: u64,
    /// Rows in the Popular view before "show all".
    pub popular_limit: usize,
    /// Rows in the New view before "show all".
    pub new_limit: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            volume: 80,
            search_debounce_ms: 300,
            popular_limit: 8,
            new_limit: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            quit_fade_out_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Page that share links point at; `?id=<track>` is appended.
    pub share_base_url: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            share_base_url: "http://localhost:3000/player.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ bahr: music, shared ~ ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Where the listener id is kept. Defaults to `$XDG_DATA_HOME/bahr/user_id`.
    pub path: Option<std::path::PathBuf>,
}
