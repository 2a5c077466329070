//! Fetching media bytes and turning them into `rodio` sinks.
//!
//! Sources are kept in memory so a seek can rebuild the sink and skip into
//! the stream without fetching again.

use std::fs;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use lofty::prelude::*;
use lofty::probe::Probe;
use rodio::{Decoder, OutputStream, Sink, Source};

pub(super) type MediaBytes = Arc<[u8]>;

/// Bytes read between two checks of the abandon condition.
pub(super) const CHUNK: usize = 64 * 1024;
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub(super) enum FetchError {
    #[error("download abandoned")]
    Abandoned,
    #[error("{0}")]
    Failed(String),
}

/// Download `url` (http/https) or read it from disk (`file://` or a plain
/// path). Gives up with `Abandoned` as soon as `abandon` returns true.
pub(super) fn fetch(
    http: &reqwest::blocking::Client,
    url: &str,
    abandon: impl Fn() -> bool,
) -> Result<MediaBytes, FetchError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let response = http
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Failed(e.to_string()))?;
        let expected = response.content_length().unwrap_or(0) as usize;
        let bytes = read_unless_abandoned(response, expected, abandon)?;
        return Ok(Arc::from(bytes));
    }

    if abandon() {
        return Err(FetchError::Abandoned);
    }
    let path = url.strip_prefix("file://").unwrap_or(url);
    fs::read(path)
        .map(Arc::from)
        .map_err(|e| FetchError::Failed(format!("{path}: {e}")))
}

/// Read `reader` to the end in `CHUNK`-sized steps, checking `abandon`
/// before each one.
pub(super) fn read_unless_abandoned(
    mut reader: impl Read,
    expected: usize,
    abandon: impl Fn() -> bool,
) -> Result<Vec<u8>, FetchError> {
    let mut bytes = Vec::with_capacity(expected.min(MAX_PREALLOC));
    let mut chunk = vec![0u8; CHUNK];
    loop {
        if abandon() {
            return Err(FetchError::Abandoned);
        }
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(bytes),
            Ok(n) => bytes.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(FetchError::Failed(e.to_string())),
        }
    }
}

/// Create a paused `Sink` over `bytes` that starts playback at `start_at`.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    bytes: &MediaBytes,
    start_at: Duration,
    volume: f32,
) -> Result<Sink, String> {
    let source = Decoder::new(Cursor::new(bytes.clone()))
        .map_err(|e| e.to_string())?
        // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
        .skip_duration(start_at);

    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume);
    sink.append(source);
    sink.pause();
    Ok(sink)
}

/// Length of the encoded stream: the decoder's answer when it has one,
/// otherwise whatever the container headers say.
pub(super) fn decoded_duration(bytes: &MediaBytes) -> Option<Duration> {
    let from_decoder = Decoder::new(Cursor::new(bytes.clone()))
        .ok()
        .and_then(|d| d.total_duration());
    from_decoder
        .or_else(|| tagged_duration(bytes))
        .filter(|d| !d.is_zero())
}

fn tagged_duration(bytes: &[u8]) -> Option<Duration> {
    let tagged = Probe::new(Cursor::new(bytes))
        .guess_file_type()
        .ok()?
        .read()
        .ok()?;
    Some(tagged.properties().duration())
}
