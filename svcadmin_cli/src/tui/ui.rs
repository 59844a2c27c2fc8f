//! TUI rendering functions

use super::app::{DashboardApp, View};
use crate::feed::ConnectionState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, TableState,
    },
    Frame,
};
use serde_json::Value;
use svcadmin_common::{format_duration, format_percentage, Setting, SELF_RESOURCE};

/// Most history rows shown under the settings table
const HISTORY_ROWS: usize = 10;

/// Draw the dashboard
pub fn draw(frame: &mut Frame, app: &DashboardApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Length(2), // View tabs
            Constraint::Min(5),    // Body
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    draw_title_bar(frame, app, chunks[0]);
    draw_tabs(frame, app, chunks[1]);
    match app.view {
        View::Status => draw_status(frame, app, chunks[2]),
        View::Settings => draw_settings(frame, app, chunks[2]),
    }
    draw_footer(frame, app, chunks[3]);
}

fn draw_title_bar(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let title = if app.info.title.is_empty() {
        app.caption.as_str()
    } else {
        app.info.title.as_str()
    };

    let mut spans = vec![
        Span::styled(
            " SVCADMIN ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(title, Style::default().fg(Color::Cyan)),
    ];
    if !app.info.version.is_empty() {
        spans.push(Span::styled(
            format!("  v{}", app.info.version),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans.push(Span::styled(
        format!("  {}", app.info.server_url),
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_tabs(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let tab_style = |active: bool| {
        if active {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let state = match app.view {
        View::Status => app.status_state,
        View::Settings => app.settings_state,
    };

    let line = Line::from(vec![
        Span::styled(" Status ", tab_style(app.view == View::Status)),
        Span::raw(" "),
        Span::styled(" Settings ", tab_style(app.view == View::Settings)),
        Span::styled("  │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            state.as_str(),
            Style::default()
                .fg(state_color(state))
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_status(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    // Target selector
    let mut spans = Vec::new();
    for (i, target) in app.targets.iter().enumerate() {
        let style = if i == app.selected_target {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        // The service's own tab carries its caption
        let label = if target == SELF_RESOURCE && !app.caption.is_empty() {
            app.caption.as_str()
        } else {
            target.as_str()
        };
        spans.push(Span::styled(format!(" {} ", label), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);

    let title = match app.snapshot_at {
        Some(at) => format!(" {} · {} ", app.target(), at.format("%H:%M:%S")),
        None => format!(" {} ", app.target()),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let Some(snapshot) = &app.snapshot else {
        let text = match app.status_state {
            ConnectionState::Connected => "Waiting for the first update...",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Disconnected => "Not connected. Press r to reconnect.",
        };
        let paragraph = Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray)))
            .block(block);
        frame.render_widget(paragraph, chunks[1]);
        return;
    };

    let rows: Vec<Row> = snapshot_rows(snapshot)
        .into_iter()
        .map(|(key, value)| {
            Row::new(vec![
                Cell::from(key).style(Style::default().fg(Color::DarkGray)),
                Cell::from(value).style(Style::default().fg(Color::White)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Percentage(40), Constraint::Min(10)]).block(block);
    frame.render_widget(table, chunks[1]);
}

fn draw_settings(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let header = Row::new(vec!["Key", "Value", "Description"])
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .settings
        .iter()
        .map(|setting| {
            Row::new(vec![
                Cell::from(setting.key.as_str()).style(Style::default().fg(Color::Cyan)),
                Cell::from(setting.value.as_str()),
                Cell::from(setting.description().unwrap_or_default())
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let selected = app.selected_setting_entry();
    let history_len = selected.map_or(0, |s| s.history.len());
    let panes = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(history_height(history_len))])
        .split(area);
    if let Some(setting) = selected.filter(|s| !s.history.is_empty()) {
        draw_history(frame, setting, panes[1]);
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(panes[0]);

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(25),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(format!(" Settings ({}) ", app.settings.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .row_highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)));

    let mut state = TableState::default();
    if !app.settings.is_empty() {
        state.select(Some(app.selected_setting));
    }
    frame.render_stateful_widget(table, chunks[0], &mut state);

    if !app.settings.is_empty() {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        let mut scrollbar_state =
            ScrollbarState::new(app.settings.len()).position(app.selected_setting);
        frame.render_stateful_widget(scrollbar, chunks[1], &mut scrollbar_state);
    }
}

/// Rows of the history pane plus its borders and header, or nothing
fn history_height(entries: usize) -> u16 {
    if entries == 0 {
        return 0;
    }
    entries.min(HISTORY_ROWS) as u16 + 3
}

fn draw_history(frame: &mut Frame, setting: &Setting, area: Rect) {
    let header = Row::new(vec!["Changed", "Owner", "Value"])
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = setting
        .history
        .iter()
        .take(HISTORY_ROWS)
        .map(|entry| {
            Row::new(vec![
                Cell::from(entry.time_label()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(entry.owner.as_str()).style(Style::default().fg(Color::Yellow)),
                Cell::from(entry.value.as_str()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(19),
            Constraint::Percentage(25),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(format!(" History of {} ", setting.key))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(table, area);
}

fn draw_footer(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let mut spans = vec![
        Span::styled("Tab", Style::default().fg(Color::Cyan)),
        Span::styled(" View  ", Style::default().fg(Color::DarkGray)),
    ];
    match app.view {
        View::Status => {
            spans.push(Span::styled("←/→", Style::default().fg(Color::Cyan)));
            spans.push(Span::styled(" Target  ", Style::default().fg(Color::DarkGray)));
        }
        View::Settings => {
            spans.push(Span::styled("↑/↓", Style::default().fg(Color::Cyan)));
            spans.push(Span::styled(" Navigate  ", Style::default().fg(Color::DarkGray)));
        }
    }
    spans.extend([
        Span::styled("r", Style::default().fg(Color::Cyan)),
        Span::styled(" Reconnect  ", Style::default().fg(Color::DarkGray)),
        Span::styled("q", Style::default().fg(Color::Cyan)),
        Span::styled(" Quit", Style::default().fg(Color::DarkGray)),
    ]);
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(
            format!("  {}", truncate_str(notice, area.width as usize / 2)),
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn state_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Connecting => Color::Yellow,
        ConnectionState::Disconnected => Color::Red,
    }
}

/// Flatten a snapshot into `path = value` rows, object keys in sorted order
pub fn snapshot_rows(snapshot: &Value) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    flatten(snapshot, String::new(), &mut rows);
    rows
}

fn flatten(value: &Value, path: String, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten(child, child_path, rows);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten(child, format!("{}[{}]", path, i), rows);
            }
        }
        _ => {
            let text = display_value(&path, value);
            rows.push((path, text));
        }
    }
}

/// Render a leaf, formatting durations and ratios by their field name
fn display_value(path: &str, value: &Value) -> String {
    let field = path
        .rsplit('.')
        .next()
        .unwrap_or(path)
        .to_ascii_lowercase();

    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(nanos) = n.as_u64().filter(|_| is_duration_field(&field)) {
                format_duration(nanos)
            } else if let Some(ratio) = n.as_f64().filter(|_| is_ratio_field(&field)) {
                format_percentage(ratio, 2)
            } else {
                n.to_string()
            }
        }
        other => other.to_string(),
    }
}

fn is_duration_field(field: &str) -> bool {
    field.ends_with("_ns") || field.contains("duration") || field.contains("latency")
}

fn is_ratio_field(field: &str) -> bool {
    field.ends_with("ratio") || field.ends_with("_rate")
}

/// Truncate a string to at most `max_len` characters
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max_len).collect()
    }
}
