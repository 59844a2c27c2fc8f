//! Dashboard state and key handling

use crate::feed::ConnectionState;
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use svcadmin_common::{
    ResourceList, ServiceMeta, Setting, SettingsList, StatusSnapshot, SELF_RESOURCE,
};

/// Dashboard views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Status,
    Settings,
}

/// What the event loop must do with the feeds after a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    /// Status view became active for this target
    ShowStatus(String),
    /// Settings view became active
    ShowSettings,
    /// Switch the status stream to another target
    SelectTarget(String),
    /// Reopen the stream of the active view
    Reconnect,
    Quit,
}

/// Events applied to the dashboard
#[derive(Debug, Clone)]
pub enum TuiEvent {
    StatusState(ConnectionState),
    Snapshot(StatusSnapshot),
    SettingsState(ConnectionState),
    Settings(SettingsList),
    /// One-line message for the footer
    Notice(String),
    Key(KeyEvent),
}

/// Service identification shown in the title bar
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub title: String,
    pub version: String,
    pub server_url: String,
}

impl ServiceInfo {
    pub fn new(meta: Option<&ServiceMeta>, server_url: &str) -> Self {
        Self {
            title: meta.map(ServiceMeta::title).unwrap_or_default(),
            version: meta.map(|m| m.version.clone()).unwrap_or_default(),
            server_url: server_url.to_string(),
        }
    }
}

/// Dashboard application state
pub struct DashboardApp {
    pub view: View,
    pub info: ServiceInfo,
    pub caption: String,
    pub targets: Vec<String>,
    pub selected_target: usize,
    pub status_state: ConnectionState,
    pub snapshot: Option<StatusSnapshot>,
    pub snapshot_at: Option<DateTime<Local>>,
    pub settings_state: ConnectionState,
    pub settings: SettingsList,
    pub selected_setting: usize,
    pub notice: Option<String>,
    pub should_quit: bool,
}

impl DashboardApp {
    pub fn new(info: ServiceInfo, resources: ResourceList) -> Self {
        Self {
            view: View::Status,
            info,
            caption: resources.caption.clone(),
            targets: resources.targets(),
            selected_target: 0,
            status_state: ConnectionState::Disconnected,
            snapshot: None,
            snapshot_at: None,
            settings_state: ConnectionState::Disconnected,
            settings: SettingsList::new(),
            selected_setting: 0,
            notice: None,
            should_quit: false,
        }
    }

    /// Name of the selected status target
    pub fn target(&self) -> &str {
        self.targets
            .get(self.selected_target)
            .map(String::as_str)
            .unwrap_or(SELF_RESOURCE)
    }

    fn select_target(&mut self, index: usize) -> Action {
        if index == self.selected_target || index >= self.targets.len() {
            return Action::None;
        }
        self.selected_target = index;
        self.snapshot = None;
        self.snapshot_at = None;
        Action::SelectTarget(self.target().to_string())
    }

    /// Setting under the cursor in the settings view
    pub fn selected_setting_entry(&self) -> Option<&Setting> {
        self.settings.iter().nth(self.selected_setting)
    }

    fn last_setting(&self) -> usize {
        self.settings.len().saturating_sub(1)
    }

    /// Handle key events
    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        match (key.code, key.modifiers) {
            // Quit
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('q'), _) => {
                self.should_quit = true;
                Action::Quit
            }
            // Switch view
            (KeyCode::Tab, _) => match self.view {
                View::Status => {
                    self.view = View::Settings;
                    Action::ShowSettings
                }
                View::Settings => {
                    self.view = View::Status;
                    Action::ShowStatus(self.target().to_string())
                }
            },
            (KeyCode::Char('r'), _) => {
                self.notice = None;
                Action::Reconnect
            }
            // Targets
            (KeyCode::Left | KeyCode::Char('h'), _) if self.view == View::Status => {
                match self.selected_target.checked_sub(1) {
                    Some(index) => self.select_target(index),
                    None => Action::None,
                }
            }
            (KeyCode::Right | KeyCode::Char('l'), _) if self.view == View::Status => {
                self.select_target(self.selected_target + 1)
            }
            // Settings navigation
            (KeyCode::Up | KeyCode::Char('k'), _) if self.view == View::Settings => {
                self.selected_setting = self.selected_setting.saturating_sub(1);
                Action::None
            }
            (KeyCode::Down | KeyCode::Char('j'), _) if self.view == View::Settings => {
                self.selected_setting = (self.selected_setting + 1).min(self.last_setting());
                Action::None
            }
            (KeyCode::Home, _) if self.view == View::Settings => {
                self.selected_setting = 0;
                Action::None
            }
            (KeyCode::End, _) if self.view == View::Settings => {
                self.selected_setting = self.last_setting();
                Action::None
            }
            _ => Action::None,
        }
    }

    /// Handle TUI event
    pub fn handle_event(&mut self, event: TuiEvent) -> Action {
        match event {
            TuiEvent::StatusState(state) => self.status_state = state,
            TuiEvent::Snapshot(snapshot) => {
                self.snapshot = Some(snapshot);
                self.snapshot_at = Some(Local::now());
            }
            TuiEvent::SettingsState(state) => self.settings_state = state,
            TuiEvent::Settings(settings) => {
                self.settings = settings;
                self.selected_setting = self.selected_setting.min(self.last_setting());
            }
            TuiEvent::Notice(notice) => self.notice = Some(notice),
            TuiEvent::Key(key) => return self.handle_key(key),
        }
        Action::None
    }
}
