//! Terminal dashboard for live status and settings

mod app;
mod ui;

pub use app::{Action, DashboardApp, ServiceInfo, TuiEvent, View};
pub use ui::draw;
