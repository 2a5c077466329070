//! Publishing a local audio file.
//!
//! The file is checked locally, posted to the file host, and the returned URL
//! is recorded as a new track in the store. Nothing here touches the player.

mod client;
mod validate;

pub use client::{UploadClient, hosted_url};
pub use validate::{CheckedFile, UploadRequest, ValidationError, check, mime_for};

use crate::catalog::{NewTrack, Track};
use crate::store::{StoreError, TrackStore};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The file host could not be reached or rejected the upload.
    #[error("upload failed: {0}")]
    Transport(String),
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not save track: {0}")]
    Store(#[from] StoreError),
}

/// Check `request`, upload the file and create its track record.
pub async fn publish<S: TrackStore>(
    store: &S,
    client: &UploadClient,
    request: UploadRequest,
    uploader_id: &str,
    max_bytes: u64,
) -> Result<Track, UploadError> {
    let file = check(request, max_bytes)?;
    log::info!(
        "uploading {} ({}, {} bytes)",
        file.path.display(),
        file.mime,
        file.size
    );

    let audio_url = client.upload(&file).await?;
    log::info!("stored at {audio_url}");

    let track = store
        .create_track(NewTrack {
            title: file.title,
            artist: file.artist,
            audio_url,
            image_url: None,
            genre: file.genre,
            description: file.description,
            duration_ms: file.duration_ms,
            uploader_id: uploader_id.to_string(),
        })
        .await?;
    Ok(track)
}
