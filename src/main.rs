//! livechat-replay — terminal host for the live chat replay pipeline.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  Batch   ┌────────────┐  Emission  ┌──────────┐  draw()  ┌──────────┐
//! │  Poller  │ ───────► │ Scheduler  │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (thread) │ (queue)  │  (tick)    │   (sink)   │ (state)  │          │ (render) │
//! └──────────┘          └────────────┘            └──────────┘          └──────────┘
//!                                                      ▲
//!                                                      │ handle_key_event()
//!                                                 ┌──────────┐
//!                                                 │ input.rs │
//!                                                 └──────────┘
//! ```
//!
//! * **`app`** — owns the view state (released lines, actions, scroll position).
//! * **`ui`** — pure rendering: reads `App` state and draws widgets.
//! * **`input`** — maps key events to `App` mutations and session commands.
//! * **`main`** — wires everything together: parse args, load config, set up
//!   logging and the terminal, and run the tick loop.

mod app;
mod input;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use livechat_replay::config::{default_config_path, AppConfig};
use livechat_replay::logging::{default_log_dir, default_log_file, init_logging};
use livechat_replay::{
    DisplayScheduler, Emission, Poller, PollerSettings, PollerState, YouTubeClient,
};

use app::App;
use input::Command;

/// Host tick; also the upper bound on display-time jitter.
const TICK_RATE: Duration = Duration::from_millis(100);

/// Replay a YouTube live chat on a smoothed timeline.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Video whose live chat to follow (overrides the config file).
    #[arg(long)]
    video_id: Option<String>,

    /// YouTube Data API key.
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Config file, created with defaults if missing.
    #[arg(long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Polling interval used until the API advises one (overrides the config file).
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Directory for the log file.
    #[arg(long, default_value = default_log_dir())]
    log_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Poll session
// ---------------------------------------------------------------------------

/// The poller and scheduler for the configured video.
struct Session {
    client: Arc<YouTubeClient>,
    poller: Option<Poller<YouTubeClient>>,
    scheduler: DisplayScheduler,
    api_key: Option<String>,
    /// Poller state seen on the previous tick.
    last_state: PollerState,
    /// Set by `x`; a stop the user asked for is not reported as a failure.
    user_stopped: bool,
}

impl Session {
    fn new(api_key: Option<String>) -> Self {
        Self {
            client: Arc::new(YouTubeClient::new()),
            poller: None,
            scheduler: DisplayScheduler::default(),
            api_key,
            last_state: PollerState::Idle,
            user_stopped: false,
        }
    }

    fn start(&mut self, app: &mut App, config: &AppConfig) {
        let Some(api_key) = self.api_key.as_deref() else {
            app.status = "No API key: pass --api-key or set YOUTUBE_API_KEY".into();
            return;
        };
        let Some(video_id) = config.video_id.as_deref() else {
            app.status = "No video id: pass --video-id or set videoId in the config".into();
            return;
        };

        let poller = self.poller.get_or_insert_with(|| {
            let settings = PollerSettings::new(video_id, api_key)
                .with_default_interval(config.polling_interval());
            Poller::with_client(Arc::clone(&self.client), settings)
        });

        match poller.start() {
            Ok(()) => self.started(app, video_id),
            Err(e) => {
                warn!(error = %e, "failed to start poller");
                app.status = format!("Error: {e}");
            }
        }
    }

    fn stop(&mut self, app: &mut App) {
        self.user_stopped = true;
        if let Some(poller) = &self.poller {
            poller.stop();
            poller.queue().clear();
        }
        self.scheduler.clear();
        app.clear();
        app.status = "Stopped".into();
    }

    /// Move fetched batches into the scheduler and release what is due.
    fn tick(&mut self, app: &mut App, config: &AppConfig) {
        let Some(poller) = &self.poller else {
            return;
        };

        self.scheduler.ingest_from(&poller.queue());
        self.scheduler
            .tick(Utc::now(), &mut |e: Emission| app.record(e, config));

        let state = poller.state();
        self.observe(app, state);
        app.pending = self.scheduler.len();
    }

    /// A new run was spawned; its first state change must be reported.
    fn started(&mut self, app: &mut App, video_id: &str) {
        self.user_stopped = false;
        self.last_state = PollerState::Resolving;
        app.status = format!("Connecting to {video_id}");
    }

    /// Update the status line when the poller changes state.
    fn observe(&mut self, app: &mut App, state: PollerState) {
        if state != self.last_state {
            match state {
                PollerState::Polling => app.status = "Live".into(),
                PollerState::Stopped if !self.user_stopped => {
                    app.status = "Poller stopped: live chat unavailable, see the log".into();
                }
                _ => {}
            }
            self.last_state = state;
        }
        app.poller_state = state;
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _logging = init_logging(&cli.log_dir, default_log_file())
        .with_context(|| format!("failed to set up logging in {}", cli.log_dir.display()))?;

    // -- configuration -------------------------------------------------------
    let mut config = AppConfig::load_from(&cli.config)?;
    if let Some(video_id) = cli.video_id {
        config.video_id = Some(video_id);
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.polling_interval_ms = interval_ms;
    }
    if let Err(e) = config.save_to(&cli.config) {
        warn!(error = %e, "could not save config");
    }
    info!(config = %cli.config.display(), video_id = ?config.video_id, "loaded config");

    let mut app = App::new();
    app.warning = config.interval_warning();
    if let Some(warning) = &app.warning {
        warn!("{warning}");
    }

    let mut session = Session::new(cli.api_key);

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    install_panic_hook();
    let mut guard = TerminalGuard::new()?;

    // -- main event loop -----------------------------------------------------
    // Each iteration:
    //   1. Drain the poller queue and release due items.
    //   2. Render the UI.
    //   3. Poll for keyboard input (non-blocking, up to the tick rate).
    loop {
        session.tick(&mut app, &config);

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                match input::handle_key_event(&mut app, key) {
                    Some(Command::Start) => session.start(&mut app, &config),
                    Some(Command::Stop) => session.stop(&mut app),
                    None => {}
                }
            }
        }

        if app.quit {
            break;
        }
    }

    // The poller thread is joined when `session` drops, before `guard`
    // restores the terminal.
    drop(session);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use livechat_replay::ItemKind;

    const FAILED: &str = "Poller stopped: live chat unavailable, see the log";

    fn emission(text: &str) -> Emission {
        Emission {
            id: text.to_string(),
            author: "viewer".to_string(),
            text: text.to_string(),
            kind: ItemKind::Text {
                message: text.to_string(),
            },
            display_at: Utc::now(),
        }
    }

    #[test]
    fn setup_failure_is_reported() {
        let mut session = Session::new(Some("key".into()));
        let mut app = App::new();

        session.started(&mut app, "abc");
        session.observe(&mut app, PollerState::Stopped);

        assert_eq!(app.status, FAILED);
        assert_eq!(app.poller_state, PollerState::Stopped);
    }

    #[test]
    fn repeated_setup_failure_is_reported_again() {
        let mut session = Session::new(Some("key".into()));
        let mut app = App::new();

        session.started(&mut app, "abc");
        session.observe(&mut app, PollerState::Stopped);

        // The second run fails before a tick sees it resolving.
        session.started(&mut app, "abc");
        assert_eq!(app.status, "Connecting to abc");
        session.observe(&mut app, PollerState::Stopped);

        assert_eq!(app.status, FAILED);
    }

    #[test]
    fn polling_shows_live() {
        let mut session = Session::new(Some("key".into()));
        let mut app = App::new();

        session.started(&mut app, "abc");
        session.observe(&mut app, PollerState::Polling);
        assert_eq!(app.status, "Live");
    }

    #[test]
    fn user_stop_clears_view_and_is_not_a_failure() {
        let mut session = Session::new(Some("key".into()));
        let mut app = App::new();
        app.record(emission("hello"), &AppConfig::default());

        session.started(&mut app, "abc");
        session.stop(&mut app);
        session.observe(&mut app, PollerState::Stopped);

        assert!(app.lines.is_empty());
        assert!(session.scheduler.is_empty());
        assert_eq!(app.status, "Stopped");
    }

    #[test]
    fn start_without_api_key_explains_itself() {
        let mut session = Session::new(None);
        let mut app = App::new();
        let config = AppConfig {
            video_id: Some("abc".into()),
            ..AppConfig::default()
        };

        session.start(&mut app, &config);

        assert!(session.poller.is_none());
        assert!(app.status.contains("YOUTUBE_API_KEY"));
    }
}
