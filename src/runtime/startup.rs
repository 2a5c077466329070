use std::time::Duration;

use crate::config::Settings;
use crate::identity;
use crate::store::{Backend, MemoryStore, RestStore, StoreError};

/// Effective settings. A broken or invalid config file is reported and
/// replaced by the defaults rather than stopping the app.
pub fn load_settings() -> Settings {
    let loaded = Settings::load()
        .map_err(|e| format!("failed to load config: {e}"))
        .and_then(|s| match s.validate() {
            Ok(()) => Ok(s),
            Err(msg) => Err(format!("invalid config: {msg}")),
        });
    loaded.unwrap_or_else(|msg| {
        log::warn!("{msg}; using defaults");
        Settings::default()
    })
}

/// The remote database when one is configured, otherwise the demo catalogue.
pub fn open_backend(settings: &Settings) -> Result<Backend, StoreError> {
    let backend = match settings.store.database_url.as_deref() {
        Some(url) => Backend::Remote(RestStore::new(
            url,
            settings.store.auth_token.clone(),
            Duration::from_secs(settings.store.timeout_secs),
        )?),
        None => Backend::Local(MemoryStore::demo()),
    };
    log::info!("track store: {}", backend.describe());
    Ok(backend)
}

/// The persisted listener id. An unwritable profile still gets a session id
/// so likes keep working until exit.
pub fn listener_id(settings: &Settings) -> String {
    let path = settings.identity.path.clone().or_else(identity::default_path);
    let now_ms = chrono::Utc::now().timestamp_millis();
    let Some(path) = path else {
        log::warn!("no home directory; using a session-only listener id");
        return identity::generate(now_ms);
    };
    match identity::load_or_create(&path) {
        Ok(id) => id,
        Err(e) => {
            log::warn!("cannot keep listener id at {}: {e}", path.display());
            identity::generate(now_ms)
        }
    }
}
