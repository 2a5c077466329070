//! Realtime-database REST adapter.
//!
//! Every node is addressed as `<base>/<path>.json`. Play counts use the
//! server-side `increment` value so concurrent listeners never lose updates;
//! the like counter uses an ETag compare-and-swap because it must floor at 0.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::catalog::{self, NewTrack, Track};

use super::{StoreError, TrackStore};

const TRACKS: &str = "tracks";
const LIKES: &str = "likes";
const MAX_CAS_ATTEMPTS: usize = 5;

pub struct RestStore {
    http: reqwest::Client,
    base: String,
    auth: Option<String>,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl RestStore {
    pub fn new(
        database_url: &str,
        auth: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base: database_url.trim().trim_end_matches('/').to_string(),
            auth: auth.filter(|a| !a.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        node_url(&self.base, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut rb = self.http.request(method, self.url(path));
        if let Some(auth) = &self.auth {
            rb = rb.query(&[("auth", auth.as_str())]);
        }
        rb
    }

    async fn send(&self, rb: RequestBuilder) -> Result<Response, StoreError> {
        let response = rb
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        checked(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        log::debug!("GET {path}");
        let response = self.send(self.request(Method::GET, path)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    /// Whether a node exists, without downloading its children.
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let rb = self
            .request(Method::GET, path)
            .query(&[("shallow", "true")]);
        let response = self.send(rb).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(!value.is_null())
    }

    /// `true` at `path` when liked, no node otherwise.
    async fn write_like(&self, path: &str, liked: bool) -> Result<(), StoreError> {
        let rb = if liked {
            self.request(Method::PUT, path).json(&true)
        } else {
            self.request(Method::DELETE, path)
        };
        self.send(rb).await?;
        Ok(())
    }

    /// Add `delta` to the integer at `path`, clamping at zero, with an ETag
    /// guarded write so a concurrent writer forces a re-read instead of being
    /// overwritten.
    async fn adjust_counter(&self, path: &str, delta: i64) -> Result<u64, StoreError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let rb = self
                .request(Method::GET, path)
                .header("X-Firebase-ETag", "true");
            let response = self.send(rb).await?;
            let etag = response
                .headers()
                .get("ETag")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| StoreError::Malformed(format!("no ETag for {path}")))?;
            let current: Value = response
                .json()
                .await
                .map_err(|e| StoreError::Malformed(e.to_string()))?;
            let next = apply_delta(&current, delta);

            let write = self
                .request(Method::PUT, path)
                .header("if-match", etag)
                .json(&next)
                .send()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            if write.status() == StatusCode::PRECONDITION_FAILED {
                log::debug!("counter {path} changed under us (attempt {attempt}), retrying");
                continue;
            }
            checked(write).await?;
            return Ok(next);
        }
        Err(StoreError::Conflict(path.to_string()))
    }
}

async fn checked(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Unavailable(format!("HTTP {status}: {}", body.trim())))
}

/// `<base>/<path>.json`
pub(super) fn node_url(base: &str, path: &str) -> String {
    format!("{}/{}.json", base.trim_end_matches('/'), path.trim_matches('/'))
}

/// Database keys may not be empty or contain `. $ # [ ] /` or control characters.
pub(super) fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key
            .chars()
            .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_control())
}

/// Read a stored counter (possibly legacy negative, fractional or missing)
/// and apply `delta`, never going below zero.
pub(super) fn apply_delta(current: &Value, delta: i64) -> u64 {
    let current = current
        .as_i64()
        .or_else(|| current.as_f64().map(|f| f as i64))
        .unwrap_or(0)
        .max(0);
    current.saturating_add(delta).max(0) as u64
}

/// Decode a `tracks` node (`null` or `{key: record}`) into a newest-first list.
/// The map key is authoritative for `id`; undecodable records are skipped.
pub(super) fn decode_tracks(node: Option<BTreeMap<String, Value>>) -> Vec<Track> {
    let mut tracks: Vec<Track> = node
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match decode_track(&key, value) {
            Ok(track) => Some(track),
            Err(e) => {
                log::warn!("skipping malformed track {key}: {e}");
                None
            }
        })
        .collect();
    catalog::sort_newest_first(&mut tracks);
    tracks
}

pub(super) fn decode_track(key: &str, value: Value) -> Result<Track, serde_json::Error> {
    let mut track: Track = serde_json::from_value(value)?;
    track.id = key.to_string();
    Ok(track)
}

impl TrackStore for RestStore {
    async fn create_track(&self, draft: NewTrack) -> Result<Track, StoreError> {
        let mut track = draft.into_track(String::new(), chrono::Utc::now().timestamp_millis());
        let mut body =
            serde_json::to_value(&track).map_err(|e| StoreError::Malformed(e.to_string()))?;
        if let Some(obj) = body.as_object_mut() {
            obj.remove("id");
        }

        let response = self
            .send(self.request(Method::POST, TRACKS).json(&body))
            .await?;
        let pushed: PushResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        let path = format!("{TRACKS}/{}", pushed.name);
        self.send(self.request(Method::PATCH, &path).json(&json!({ "id": pushed.name })))
            .await?;

        log::info!("created track {} ({})", pushed.name, track.title);
        track.id = pushed.name;
        Ok(track)
    }

    async fn list_tracks(&self) -> Result<Vec<Track>, StoreError> {
        let node: Option<BTreeMap<String, Value>> = self.get_json(TRACKS).await?;
        Ok(decode_tracks(node))
    }

    async fn get_track(&self, id: &str) -> Result<Option<Track>, StoreError> {
        if !is_valid_key(id) {
            return Ok(None);
        }
        let node: Option<Value> = self.get_json(&format!("{TRACKS}/{id}")).await?;
        match node {
            None => Ok(None),
            Some(value) => decode_track(id, value)
                .map(Some)
                .map_err(|e| StoreError::Malformed(e.to_string())),
        }
    }

    async fn increment_plays(&self, id: &str) -> Result<(), StoreError> {
        if !is_valid_key(id) {
            return Ok(());
        }
        let path = format!("{TRACKS}/{id}");
        if !self.exists(&path).await? {
            return Ok(());
        }
        let body = json!({ "plays": { ".sv": { "increment": 1 } } });
        self.send(self.request(Method::PATCH, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn toggle_like(&self, track_id: &str, user_id: &str) -> Result<bool, StoreError> {
        if !is_valid_key(track_id) || !is_valid_key(user_id) {
            return Ok(false);
        }
        if !self.exists(&format!("{TRACKS}/{track_id}")).await? {
            return Ok(false);
        }

        let like_path = format!("{LIKES}/{track_id}/{user_id}");
        let counter_path = format!("{TRACKS}/{track_id}/likes");
        let liked = !self.exists(&like_path).await?;
        self.write_like(&like_path, liked).await?;
        if let Err(e) = self
            .adjust_counter(&counter_path, if liked { 1 } else { -1 })
            .await
        {
            // Put the like node back so it keeps matching the counter.
            if let Err(undo) = self.write_like(&like_path, !liked).await {
                log::warn!("could not restore {like_path} after a failed counter update: {undo}");
            }
            return Err(e);
        }
        Ok(liked)
    }

    async fn check_like(&self, track_id: &str, user_id: &str) -> Result<bool, StoreError> {
        if !is_valid_key(track_id) || !is_valid_key(user_id) {
            return Ok(false);
        }
        self.exists(&format!("{LIKES}/{track_id}/{user_id}")).await
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, StoreError> {
        let tracks = self.list_tracks().await?;
        Ok(catalog::search(&tracks, query))
    }
}
