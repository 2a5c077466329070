use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lofty::prelude::*;

/// What the user asked to publish. Missing title/artist fall back to the
/// file's tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
}

/// A file that passed every local check, with its resolved metadata.
#[derive(Debug, Clone)]
pub struct CheckedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: &'static str,
    pub size: u64,
    pub title: String,
    pub artist: String,
    pub genre: Option<String>,
    pub description: Option<String>,
    /// 0 when unknown.
    pub duration_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{0}: no such file")]
    NotFound(PathBuf),
    #[error("{0}: not a regular file")]
    NotAFile(PathBuf),
    #[error("{0}: not an audio file")]
    NotAudio(PathBuf),
    #[error("{0}: file is empty")]
    Empty(PathBuf),
    #[error("file is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("{path}: {source}")]
    Unreadable { path: PathBuf, source: io::Error },
}

/// `audio/*` type for a file name, decided by its extension.
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "webm" => "audio/webm",
        _ => return None,
    };
    Some(mime)
}

#[derive(Default)]
struct FileTags {
    title: Option<String>,
    artist: Option<String>,
    genre: Option<String>,
    duration_ms: u64,
}

fn read_file_tags(path: &Path) -> FileTags {
    let Ok(tagged) = lofty::read_from_path(path) else {
        return FileTags::default();
    };
    let duration_ms = u64::try_from(tagged.properties().duration().as_millis()).unwrap_or(0);
    let mut tags = FileTags {
        duration_ms,
        ..FileTags::default()
    };
    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        tags.title = tag.title().map(|v| v.to_string());
        tags.artist = tag.artist().map(|v| v.to_string());
        tags.genre = tag.genre().map(|v| v.to_string());
    }
    tags
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Run the local checks. Nothing is sent anywhere.
pub fn check(request: UploadRequest, max_bytes: u64) -> Result<CheckedFile, ValidationError> {
    let path = request.path;
    let meta = match fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ValidationError::NotFound(path));
        }
        Err(source) => return Err(ValidationError::Unreadable { path, source }),
    };
    if !meta.is_file() {
        return Err(ValidationError::NotAFile(path));
    }
    let Some(mime) = mime_for(&path) else {
        return Err(ValidationError::NotAudio(path));
    };
    let size = meta.len();
    if size == 0 {
        return Err(ValidationError::Empty(path));
    }
    if size > max_bytes {
        return Err(ValidationError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    let tags = read_file_tags(&path);
    let title = non_blank(request.title)
        .or_else(|| non_blank(tags.title))
        .ok_or(ValidationError::MissingField("title"))?;
    let artist = non_blank(request.artist)
        .or_else(|| non_blank(tags.artist))
        .ok_or(ValidationError::MissingField("artist"))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    Ok(CheckedFile {
        file_name,
        mime,
        size,
        title,
        artist,
        genre: non_blank(request.genre).or_else(|| non_blank(tags.genre)),
        description: non_blank(request.description),
        duration_ms: tags.duration_ms,
        path,
    })
}
