//! Session log browsing

mod loader;

pub use loader::{LoadOutcome, SessionLoader};
