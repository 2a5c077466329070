use chrono::{DateTime, Utc};

use super::model::Track;

const DAY_MS: i64 = 86_400_000;

/// Format seconds as `M:SS`. Non-finite or negative input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let secs = seconds.floor() as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Format a millisecond duration as `M:SS`.
pub fn format_duration_ms(ms: u64) -> String {
    format_time((ms / 1000) as f64)
}

/// Relative creation date used by the "New" list: today, yesterday, a few
/// days ago, otherwise the calendar date.
pub fn format_date(timestamp_ms: i64, now_ms: i64) -> String {
    if timestamp_ms <= 0 {
        return "Unknown date".to_string();
    }
    let diff = now_ms - timestamp_ms;
    if diff < DAY_MS {
        "Today".to_string()
    } else if diff < 2 * DAY_MS {
        "Yesterday".to_string()
    } else if diff < 7 * DAY_MS {
        format!("{} days ago", diff / DAY_MS)
    } else {
        DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "Unknown date".to_string())
    }
}

/// Human-readable byte size with two decimals (`1.5 MB`).
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Title with the same fallback the list rows use.
pub fn display_title(track: &Track) -> &str {
    if track.title.trim().is_empty() {
        "Untitled"
    } else {
        &track.title
    }
}

pub fn display_artist(track: &Track) -> &str {
    if track.artist.trim().is_empty() {
        "Unknown artist"
    } else {
        &track.artist
    }
}

/// `Artist - Title`, as shown in the now-playing line and MPRIS.
pub fn display_line(track: &Track) -> String {
    format!("{} - {}", display_artist(track), display_title(track))
}
