//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Padding, Paragraph, Tabs, Wrap},
};
use std::time::Duration;

use crate::app::{Browser, Controller, PlaybackState, Popup, Row};
use crate::audio::MediaElement;
use crate::catalog::{self, View};
use crate::config::Settings;
use crate::store::TrackStore;

const CONTROLS: [(&str, &str); 14] = [
    ("j/k", "up/down"),
    ("enter", "play"),
    ("space/p", "play/pause"),
    ("h/l", "prev/next"),
    ("tab", "view"),
    ("a", "show all"),
    ("f", "like"),
    ("/", "search"),
    ("0-9", "seek"),
    ("+/-", "volume"),
    ("s", "share"),
    ("K", "details"),
    ("r", "refresh"),
    ("q", "quit"),
];

fn controls_text() -> String {
    CONTROLS
        .iter()
        .map(|(k, v)| format!("[{k}] {v}"))
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Screen regions, shared by rendering and mouse hit-testing.
pub struct Areas {
    pub header: Rect,
    pub status: Rect,
    pub tabs: Rect,
    pub list: Rect,
    pub progress: Rect,
    pub footer: Rect,
}

pub fn areas(area: Rect) -> Areas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(area);
    Areas {
        header: chunks[0],
        status: chunks[1],
        tabs: chunks[2],
        list: chunks[3],
        progress: chunks[4],
        footer: chunks[5],
    }
}

/// Fraction of the progress bar under a click at (`column`, `row`), if the
/// click landed on the bar itself (inside its border).
pub fn progress_fraction(area: Rect, column: u16, row: u16) -> Option<f64> {
    let bar = areas(area).progress;
    let inner = Rect {
        x: bar.x.saturating_add(1),
        y: bar.y.saturating_add(1),
        width: bar.width.saturating_sub(2),
        height: bar.height.saturating_sub(2),
    };
    if inner.width == 0
        || row < inner.y
        || row >= inner.y + inner.height
        || column < inner.x
        || column >= inner.x + inner.width
    {
        return None;
    }
    let offset = f64::from(column - inner.x);
    let width = f64::from(inner.width.saturating_sub(1).max(1));
    Some((offset / width).clamp(0.0, 1.0))
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn status_text<S: TrackStore + 'static, M: MediaElement>(
    ctrl: &Controller<S, M>,
    browser: &Browser,
    source: &str,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    match ctrl.current_track() {
        Some(track) => parts.push(format!("Song: {}", catalog::display_line(track))),
        None if ctrl.current_id().is_some() => parts.push("Song: (removed)".to_string()),
        None => {}
    }
    parts.push(ctrl.state().label().to_string());

    match ctrl.like_button() {
        Some(true) => parts.push("♥ liked".to_string()),
        Some(false) => parts.push("♡".to_string()),
        None => {}
    }

    parts.push(format!(
        "{} {}%",
        ctrl.volume_tier().icon(),
        (ctrl.volume() * 100.0).round() as u32
    ));

    if browser.typing {
        parts.push(format!("SEARCH: {}_", browser.query));
    }

    parts.push(source.to_string());

    if let Some(msg) = ctrl.status() {
        parts.push(format!("! {msg}"));
    }

    parts.join(" • ")
}

fn progress_label(elapsed: Duration, total: Option<Duration>) -> String {
    match total {
        Some(t) => format!(
            "{} / {}",
            catalog::format_time(elapsed.as_secs_f64()),
            catalog::format_time(t.as_secs_f64())
        ),
        None => catalog::format_time(elapsed.as_secs_f64()),
    }
}

fn row_item<'a, S: TrackStore + 'static, M: MediaElement>(
    ctrl: &Controller<S, M>,
    row: &Row<'a>,
    now_ms: i64,
) -> ListItem<'a> {
    let track = row.track;
    let marker = match (row.index, ctrl.current_index()) {
        (Some(i), Some(c)) if i == c => "▶ ",
        _ => "  ",
    };
    let heart = if ctrl.is_liked(&track.id) { " ♥" } else { "" };
    let text = format!(
        "{marker}{}  ·  {} plays · {} likes · {}{heart}",
        catalog::display_line(track),
        track.plays,
        track.likes,
        catalog::format_date(track.timestamp, now_ms),
    );
    let item = ListItem::new(text);
    if row.index.is_none() {
        item.style(Style::default().add_modifier(Modifier::DIM))
    } else {
        item
    }
}

fn details_text(row: Option<&Row<'_>>, now_ms: i64) -> String {
    let Some(row) = row else {
        return "No track highlighted".to_string();
    };
    let t = row.track;
    let duration = if t.duration_ms > 0 {
        catalog::format_duration_ms(t.duration_ms)
    } else {
        "-".to_string()
    };
    format!(
        "Title: {}\nArtist: {}\nGenre: {}\nDuration: {}\nPlays: {}  Likes: {}\nAdded: {}\nDescription: {}\nId: {}",
        catalog::display_title(t),
        catalog::display_artist(t),
        t.genre.as_deref().filter(|g| !g.is_empty()).unwrap_or("-"),
        duration,
        t.plays,
        t.likes,
        catalog::format_date(t.timestamp, now_ms),
        t.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("-"),
        t.id,
    )
}

fn padded_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        })
}

/// Render the entire UI into the provided `frame`.
pub fn draw<S: TrackStore + 'static, M: MediaElement>(
    frame: &mut Frame,
    ctrl: &Controller<S, M>,
    browser: &Browser,
    settings: &Settings,
    source: &str,
) {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let areas = areas(frame.area());

    // Header
    let header = Paragraph::new(settings.ui.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" bahr ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, areas.header);

    let status = Paragraph::new(status_text(ctrl, browser, source))
        .block(padded_block(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, areas.status);

    let tab_views = [View::Popular, View::New, View::All];
    let selected_tab = tab_views.iter().position(|v| *v == browser.view);
    let tabs = Tabs::new(tab_views.iter().map(|v| Line::from(v.title())))
        .select(if browser.searching() { None } else { selected_tab })
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .divider("|");
    frame.render_widget(tabs, areas.tabs);

    // Main list
    let rows = browser.rows(ctrl);
    {
        let limit = match browser.view {
            View::Popular => Some(settings.player.popular_limit),
            View::New => Some(settings.player.new_limit),
            View::All => None,
        };
        let title = format!(" {} ", browser.title(limit));

        // Only build ListItems for the visible window.
        let total = rows.len();
        let list_height = areas.list.height.saturating_sub(2) as usize;
        let sel_pos = browser.cursor.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = rows[start..end]
            .iter()
            .map(|row| row_item(ctrl, row, now_ms))
            .collect();

        let empty = visible_items.is_empty();
        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if !empty {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, areas.list, &mut state);
    }

    // Progress
    let elapsed = ctrl.position();
    let total = ctrl.duration();
    let ratio = match total {
        Some(t) if !t.is_zero() => (elapsed.as_secs_f64() / t.as_secs_f64()).clamp(0.0, 1.0),
        _ => 0.0,
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" progress "))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(progress_label(elapsed, total));
    frame.render_widget(gauge, areas.progress);

    // Overlays stay inside the list area so header/status/footer remain visible.
    match &browser.popup {
        Some(Popup::Details) => {
            let popup_area = centered_rect_sized(72, 11, areas.list);
            frame.render_widget(Clear, popup_area);
            let text = details_text(rows.get(browser.cursor), now_ms);
            let p = Paragraph::new(text)
                .block(padded_block(" details (K closes) "))
                .wrap(Wrap { trim: true });
            frame.render_widget(p, popup_area);
        }
        Some(Popup::Share(link)) => {
            let popup_area = centered_rect_sized(72, 5, areas.list);
            frame.render_widget(Clear, popup_area);
            let p = Paragraph::new(link.as_str())
                .block(padded_block(" share link (s closes) "))
                .wrap(Wrap { trim: false });
            frame.render_widget(p, popup_area);
        }
        None => {}
    }

    if let Some(notice) = ctrl.notice() {
        let popup_area = centered_rect_sized(60, 5, areas.list);
        frame.render_widget(Clear, popup_area);
        let p = Paragraph::new(format!("{notice}\n(press any key)"))
            .alignment(Alignment::Center)
            .bold()
            .block(Block::default().borders(Borders::ALL).title(" notice "))
            .wrap(Wrap { trim: true });
        frame.render_widget(p, popup_area);
    }

    let footer = Paragraph::new(controls_text())
        .block(padded_block(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, areas.footer);

    if ctrl.state() == PlaybackState::Loading {
        frame.render_widget(
            Paragraph::new(" loading… ").alignment(Alignment::Right),
            Rect {
                height: 1,
                ..areas.progress
            },
        );
    }
}
