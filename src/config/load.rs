use std::env;
use std::path::{Path, PathBuf};

use super::schema::Settings;

/// Lower bound on the search quiet period.
pub const MIN_SEARCH_DEBOUNCE_MS: u64 = 300;

const ENV_PREFIX: &str = "BAHR";
const REDACTED: &str = "<redacted>";

impl Settings {
    /// Struct defaults, overlaid by the config file (if any), overlaid by
    /// `BAHR__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::load_from(resolve_config_path().as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Every problem found, joined with `; `.
    pub fn validate(&self) -> Result<(), String> {
        let mut problems: Vec<String> = Vec::new();

        if self.player.volume > 100 {
            problems.push("player.volume must be between 0 and 100".into());
        }
        if self.player.search_debounce_ms < MIN_SEARCH_DEBOUNCE_MS {
            problems.push(format!(
                "player.search_debounce_ms must be >= {MIN_SEARCH_DEBOUNCE_MS}"
            ));
        }
        if self.player.popular_limit == 0 || self.player.new_limit == 0 {
            problems.push("player.popular_limit and player.new_limit must be >= 1".into());
        }
        if self.store.timeout_secs == 0 {
            problems.push("store.timeout_secs must be >= 1".into());
        }
        if self.upload.max_file_mb == 0 {
            problems.push("upload.max_file_mb must be >= 1".into());
        }
        if let Some(url) = &self.store.database_url {
            if !is_http(url) {
                problems.push("store.database_url must be an http(s) URL".into());
            }
        }
        if !is_http(&self.upload.api_origin) {
            problems.push("upload.api_origin must be an http(s) URL".into());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    /// A copy safe to print: secrets are masked.
    pub fn redacted(&self) -> Settings {
        let mut copy = self.clone();
        if copy.store.auth_token.is_some() {
            copy.store.auth_token = Some(REDACTED.to_string());
        }
        copy
    }

    /// The effective settings rendered back as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// `BAHR_CONFIG_PATH` when set, otherwise the XDG default.
pub fn resolve_config_path() -> Option<PathBuf> {
    env::var_os("BAHR_CONFIG_PATH")
        .map(PathBuf::from)
        .or_else(default_config_path)
}

/// `$XDG_CONFIG_HOME/bahr/config.toml`, or `~/.config/bahr/config.toml` when
/// `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(config_home.join("bahr").join("config.toml"))
}
