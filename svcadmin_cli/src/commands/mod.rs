//! CLI subcommands

pub mod config;
pub mod dashboard;
pub mod info;
pub mod logs;
pub mod settings;
pub mod status;
