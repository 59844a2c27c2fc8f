//! Interactive dashboard command

use crate::api::AdminClient;
use crate::config::Config;
use crate::feed::{Connector, SettingsFeed, SettingsUpdate, StatusFeed, StatusUpdate};
use crate::tui::{Action, DashboardApp, ServiceInfo, TuiEvent, View};
use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

/// Handle dashboard command
pub async fn run(config: &Config) -> Result<()> {
    let client = AdminClient::from_config(config)?;
    let ws_base = config.websocket_base()?;

    // The dashboard still works without these, so failures only get logged
    let meta = match client.meta().await {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!("Could not fetch service meta: {}", e);
            None
        }
    };
    let resources = match client.resources().await {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!("Could not list resources: {}", e);
            Default::default()
        }
    };

    let mut app = DashboardApp::new(ServiceInfo::new(meta.as_ref(), &config.server_url), resources);
    let mut feeds = Feeds {
        status: StatusFeed::new(ws_base.clone()),
        settings: SettingsFeed::new(ws_base),
    };
    feeds.status.connect(app.target());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &mut feeds).await;

    feeds.status.disconnect();
    feeds.settings.disconnect();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// The two streams behind the dashboard
struct Feeds<C: Connector> {
    status: StatusFeed<C>,
    settings: SettingsFeed<C>,
}

impl<C: Connector> Feeds<C> {
    /// Carry out what a key press asked for
    fn apply(&mut self, action: Action, app: &DashboardApp) {
        match action {
            Action::None | Action::Quit => {}
            Action::ShowStatus(target) => {
                self.status.connect(&target);
            }
            Action::ShowSettings => {
                // Only the visible view keeps a status stream
                self.status.disconnect();
                self.settings.connect();
            }
            Action::SelectTarget(target) => {
                self.status.disconnect();
                self.status.connect(&target);
            }
            Action::Reconnect => match app.view {
                View::Status => {
                    self.status.disconnect();
                    self.status.connect(app.target());
                }
                View::Settings => {
                    self.settings.reconnect();
                }
            },
        }
    }

    /// Sync the dashboard after the feeds changed
    fn sync(&self, app: &mut DashboardApp) {
        app.handle_event(TuiEvent::StatusState(self.status.state()));
        app.handle_event(TuiEvent::SettingsState(self.settings.state()));
    }
}

async fn run_loop<C: Connector>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut DashboardApp,
    feeds: &mut Feeds<C>,
) -> Result<()> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(100));
    feeds.sync(app);

    loop {
        // Draw UI
        terminal.draw(|f| crate::tui::draw(f, app))?;

        tokio::select! {
            // Handle keyboard events (non-blocking)
            _ = tick_interval.tick() => {
                if event::poll(Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        let action = app.handle_event(TuiEvent::Key(key));
                        if app.should_quit {
                            return Ok(());
                        }
                        feeds.apply(action, app);
                        feeds.sync(app);
                    }
                }
            }

            Some(event) = feeds.status.next_event() => {
                match feeds.status.handle(event) {
                    Ok(StatusUpdate::Snapshot) => {
                        if let Some(snapshot) = feeds.status.snapshot() {
                            app.handle_event(TuiEvent::Snapshot(snapshot.clone()));
                        }
                    }
                    Ok(StatusUpdate::State(state)) => {
                        app.handle_event(TuiEvent::StatusState(state));
                    }
                    Ok(StatusUpdate::Ignored) => {}
                    Err(e) => {
                        app.handle_event(TuiEvent::Notice(format!("Skipped status update: {}", e)));
                    }
                }
            }

            Some(event) = feeds.settings.next_event() => {
                match feeds.settings.handle(event) {
                    Ok(SettingsUpdate::Settings) => {
                        app.handle_event(TuiEvent::Settings(feeds.settings.settings().clone()));
                    }
                    Ok(SettingsUpdate::State(state)) => {
                        app.handle_event(TuiEvent::SettingsState(state));
                    }
                    Ok(SettingsUpdate::Ignored) => {}
                    Err(e) => {
                        app.handle_event(TuiEvent::Notice(format!("Skipped settings update: {}", e)));
                    }
                }
            }
        }
    }
}
