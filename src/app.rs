use chrono::{DateTime, Utc};
use ratatui::widgets::ListState;
use tracing::info;

use livechat_replay::config::AppConfig;
use livechat_replay::event::format_chat;
use livechat_replay::{Emission, PollerState};

/// Oldest lines are dropped beyond this.
const MAX_LINES: usize = 1000;
/// Oldest triggered commands are dropped beyond this.
const MAX_ACTIONS: usize = 200;

/// A released chat entry, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub display_at: DateTime<Utc>,
    /// Short kind label (`chat`, `superchat`, ...).
    pub kind: String,
    pub text: String,
}

pub struct App {
    /// Released chat, oldest first.
    pub lines: Vec<ChatLine>,
    /// Action commands triggered by released items, oldest first.
    pub actions: Vec<String>,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Keep the selection pinned to the newest line.
    pub follow: bool,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last status message.
    pub status: String,
    /// Poller lifecycle as of the last tick.
    pub poller_state: PollerState,
    /// Items waiting in the scheduler.
    pub pending: usize,
    /// Interval warning from the config, if any.
    pub warning: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            actions: Vec::new(),
            list_state: ListState::default(),
            follow: true,
            quit: false,
            status: "Press s to start".into(),
            poller_state: PollerState::Idle,
            pending: 0,
            warning: None,
        }
    }

    /// Sink for released items: render the chat line and trigger actions.
    pub fn record(&mut self, emission: Emission, config: &AppConfig) {
        if let Some(command) = config.event_mappings.command_for(&emission) {
            info!(%command, "triggered action");
            push_capped(&mut self.actions, command, MAX_ACTIONS);
        }

        if !config.show_chat {
            return;
        }

        let line = ChatLine {
            display_at: emission.display_at,
            kind: emission.kind.label().to_string(),
            text: format_chat(&config.chat_format, &emission.author, &emission.text),
        };
        let dropped = push_capped(&mut self.lines, line, MAX_LINES);

        if self.follow {
            self.select_last();
        } else if let Some(i) = self.list_state.selected() {
            self.list_state.select(Some(i.saturating_sub(dropped)));
        }
    }

    /// Forget everything shown so far.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.actions.clear();
        self.list_state.select(None);
        self.follow = true;
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.lines.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.follow = i == self.lines.len() - 1;
    }

    pub fn select_previous(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.follow = false;
    }

    pub fn select_first(&mut self) {
        if !self.lines.is_empty() {
            self.list_state.select(Some(0));
            self.follow = false;
        }
    }

    pub fn select_last(&mut self) {
        if !self.lines.is_empty() {
            self.list_state.select(Some(self.lines.len() - 1));
            self.follow = true;
        }
    }
}

/// Append `value`, dropping the oldest entries beyond `cap`; returns how many were dropped.
fn push_capped<T>(list: &mut Vec<T>, value: T, cap: usize) -> usize {
    list.push(value);
    let excess = list.len().saturating_sub(cap);
    if excess > 0 {
        list.drain(..excess);
    }
    excess
}
