//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a chat list with an action log beside it, and a one-line
//!   status bar at the bottom.
//! * Colours and styles are defined inline; kind colours live in
//!   [`kind_color`].
//! * [`ratatui`] is the TUI framework; see its docs for widget details.

use chrono::Local;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use livechat_replay::PollerState;

use crate::app::App;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [main_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let [chat_area, actions_area] = Layout::horizontal([
        Constraint::Percentage(70),
        Constraint::Percentage(30),
    ])
    .areas(main_area);

    draw_chat(app, frame, chat_area);
    draw_actions(app, frame, actions_area);
    draw_status_bar(app, frame, status_area);
}

fn kind_color(kind: &str) -> Color {
    match kind {
        "chat" => Color::White,
        "superchat" | "supersticker" => Color::Yellow,
        "new-sponsor" | "milestone" | "gifting" | "gift-received" => Color::Green,
        _ => Color::DarkGray,
    }
}

/// Render the scrollable chat list.
fn draw_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .lines
        .iter()
        .map(|line| {
            let time = line.display_at.with_timezone(&Local).format("%H:%M:%S");
            let mut spans = vec![
                Span::styled(format!("{time} "), Style::default().fg(Color::DarkGray)),
            ];
            if line.kind != "chat" {
                spans.push(Span::styled(
                    format!("[{}] ", line.kind),
                    Style::default().fg(Color::Cyan),
                ));
            }
            spans.push(Span::styled(
                line.text.as_str(),
                Style::default().fg(kind_color(&line.kind)),
            ));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(list_items)
        .block(
            Block::default()
                .title(" Live Chat ")
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the most recent triggered actions, newest at the bottom.
fn draw_actions(app: &App, frame: &mut Frame, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = app.actions.len().saturating_sub(visible);
    let items: Vec<ListItem> = app.actions[start..]
        .iter()
        .map(|cmd| ListItem::new(Line::from(Span::raw(cmd.as_str()))))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Actions ")
            .borders(Borders::ALL),
    );
    frame.render_widget(list, area);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let state_color = match app.poller_state {
        PollerState::Polling => Color::Green,
        PollerState::Resolving => Color::Yellow,
        PollerState::Idle | PollerState::Stopped => Color::Red,
    };

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(app.poller_state.to_string(), Style::default().fg(state_color)),
        Span::raw("  "),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} scheduled", app.pending),
            Style::default().fg(Color::Green),
        ),
    ];
    if let Some(warning) = &app.warning {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(warning.as_str(), Style::default().fg(Color::Red)));
    }
    spans.push(Span::raw("  q: quit  s: start  x: stop  ↑/↓: scroll"));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
