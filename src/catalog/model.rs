use serde::{Deserialize, Deserializer, Serialize};

/// A published track as stored under `tracks/<id>`.
///
/// Field names follow the camelCase layout already present in the remote
/// database; `duration_ms` keeps its historical wire name `duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub audio_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "duration", default, deserialize_with = "non_negative")]
    pub duration_ms: u64,
    #[serde(default, deserialize_with = "non_negative")]
    pub plays: u64,
    #[serde(default, deserialize_with = "non_negative")]
    pub likes: u64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub uploader_id: String,
}

/// Payload for `TrackStore::create_track`. The store assigns `id` and
/// `timestamp` and starts both counters at zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewTrack {
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    pub image_url: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub duration_ms: u64,
    pub uploader_id: String,
}

impl NewTrack {
    /// Materialize the record a store persists for this payload.
    pub fn into_track(self, id: String, timestamp: i64) -> Track {
        Track {
            id,
            title: self.title,
            artist: self.artist,
            audio_url: self.audio_url,
            image_url: none_if_blank(self.image_url),
            genre: none_if_blank(self.genre),
            description: none_if_blank(self.description),
            duration_ms: self.duration_ms,
            plays: 0,
            likes: 0,
            timestamp,
            uploader_id: self.uploader_id,
        }
    }
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Counters written by older clients can be negative or fractional; clamp
/// them to a non-negative integer instead of rejecting the whole record.
fn non_negative<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    let Some(n) = value else {
        return Ok(0);
    };
    if let Some(u) = n.as_u64() {
        Ok(u)
    } else if let Some(f) = n.as_f64() {
        Ok(if f.is_finite() && f > 0.0 { f.floor() as u64 } else { 0 })
    } else {
        Ok(0)
    }
}
