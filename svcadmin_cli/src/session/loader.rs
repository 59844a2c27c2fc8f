//! Loads session traces and log file lists from the admin backend

use crate::api::{AdminClient, ApiError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use svcadmin_common::SessionTrace;

/// Result of a [`SessionLoader::load`] call
#[derive(Debug)]
pub enum LoadOutcome {
    /// The shaped trace of the latest load
    Loaded(SessionTrace),
    /// A newer load was started while this one was in flight; its result
    /// must not be shown
    Superseded,
}

/// Fetches session traces. Only the most recently started load yields a
/// result; earlier ones still in flight resolve to
/// [`LoadOutcome::Superseded`].
#[derive(Clone)]
pub struct SessionLoader {
    client: AdminClient,
    generation: Arc<AtomicU64>,
}

impl SessionLoader {
    pub fn new(client: AdminClient) -> Self {
        Self {
            client,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fetch and shape the trace `id` from log file `file`. Failures carry
    /// the server's raw error payload and are not retried.
    pub async fn load(&self, file: &str, id: &str) -> Result<LoadOutcome, ApiError> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.client.session(file, id).await;

        if self.generation.load(Ordering::SeqCst) != ticket {
            tracing::debug!("Discarding session {} from {}: superseded", id, file);
            return Ok(LoadOutcome::Superseded);
        }

        let mut trace = result?;
        trace.shape();
        Ok(LoadOutcome::Loaded(trace))
    }

    /// Log file names, most recent first
    pub async fn list_files(&self) -> Result<Vec<String>, ApiError> {
        let mut files = self.client.log_files().await?;
        sort_newest_first(&mut files);
        Ok(files)
    }

    /// The file to select when none was given
    pub async fn default_file(&self) -> Result<Option<String>, ApiError> {
        Ok(self.list_files().await?.into_iter().next())
    }
}

/// Log file names embed their date, so descending name order is newest first
fn sort_newest_first(files: &mut [String]) {
    files.sort_by(|a, b| b.cmp(a));
}
