//! Result recorder
//!
//! Turns a run's site results into the published snapshot and folds them
//! into the history ledger. The snapshot is mandatory; history problems are
//! logged and the run carries on.

use crate::output::history::History;
use crate::output::snapshot::{build_snapshot, Snapshot};
use crate::state::SiteRunResult;
use crate::storage::Storage;
use crate::PulseError;
use chrono::{DateTime, Utc};

/// Persists snapshots and history through a storage backend
#[derive(Debug)]
pub struct Recorder<S: Storage> {
    storage: S,
    history_limit: usize,
}

impl<S: Storage> Recorder<S> {
    /// Creates a recorder keeping at most `history_limit` records per URL
    pub fn new(storage: S, history_limit: usize) -> Self {
        Self {
            storage,
            history_limit: history_limit.max(1),
        }
    }

    /// Records a completed run
    ///
    /// # Arguments
    ///
    /// * `results` - One result per processed site
    /// * `timestamp` - The run timestamp, shared by snapshot and history
    ///
    /// # Returns
    ///
    /// * `Ok(Snapshot)` - The snapshot that was published
    /// * `Err(PulseError)` - The snapshot could not be written; the previous
    ///   snapshot is still in place
    pub fn record(
        &self,
        results: &[SiteRunResult],
        timestamp: DateTime<Utc>,
    ) -> Result<Snapshot, PulseError> {
        let snapshot = build_snapshot(results, timestamp);
        self.storage.save_snapshot(&snapshot)?;
        tracing::info!(
            step = "record",
            total = snapshot.summary.total_sites,
            success = snapshot.summary.success_sites,
            "Snapshot published"
        );

        self.update_history(results, timestamp);

        Ok(snapshot)
    }

    /// Appends this run to the history, degrading gracefully on failure
    fn update_history(&self, results: &[SiteRunResult], timestamp: DateTime<Utc>) {
        let mut history = match self.storage.load_history() {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(step = "history", "Unreadable history: {}", e);
                match self.storage.set_aside_history() {
                    Ok(Some(moved)) => tracing::warn!(
                        step = "history",
                        path = %moved.display(),
                        "Moved unreadable history aside, starting fresh"
                    ),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(
                            step = "history",
                            "Could not move unreadable history aside, leaving it untouched: {}",
                            e
                        );
                        return;
                    }
                }
                History::new()
            }
        };

        let appended = history.append_run(results, timestamp, self.history_limit);

        match self.storage.save_history(&history) {
            Ok(()) => tracing::info!(
                step = "history",
                appended,
                sites = history.site_count(),
                limit = self.history_limit,
                "History updated"
            ),
            Err(e) => tracing::warn!(step = "history", "Failed to write history: {}", e),
        }
    }
}
