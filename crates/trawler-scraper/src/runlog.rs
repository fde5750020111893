//! Run lifecycle accounting.
//!
//! [`RunLog::open`] hands out an [`OpenRun`] token and
//! [`RunLog::finalize`] consumes it, so a run cannot be finalized twice
//! through this API. The store also refuses a second terminal write.

use crate::error::Result;
use chrono::{DateTime, Utc};
use trawler_core::RunId;
use trawler_db::{RunOutcome, RunRecord, RunStore};

/// A run that has been recorded as started and not yet finalized.
#[derive(Debug)]
#[must_use = "an open run must be finalized"]
pub struct OpenRun {
    id: RunId,
    started_at: DateTime<Utc>,
}

impl OpenRun {
    /// Run identifier.
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// When the run was opened.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Writes the start and the terminal state of each run.
#[derive(Debug, Clone)]
pub struct RunLog<S> {
    store: S,
}

impl<S: RunStore> RunLog<S> {
    /// Create a run log over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a new open run.
    pub async fn open(&self) -> Result<OpenRun> {
        let id = RunId::generate();
        let started_at = Utc::now();

        self.store
            .create_run(&RunRecord::open(&id, started_at))
            .await?;

        tracing::info!(run_id = %id, "Run started");
        Ok(OpenRun { id, started_at })
    }

    /// Write the terminal state of `run`.
    pub async fn finalize(
        &self,
        run: OpenRun,
        success: bool,
        listings_found: u32,
        error: Option<String>,
    ) -> Result<RunOutcome> {
        let outcome = RunOutcome {
            end_time: Utc::now(),
            success,
            listings_found,
            error,
        };

        self.store.finalize_run(run.id.as_str(), &outcome).await?;

        if success {
            tracing::info!(run_id = %run.id, listings_found, "Run finished");
        } else {
            tracing::error!(
                run_id = %run.id,
                listings_found,
                "Run failed: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trawler_db::Database;

    async fn setup_test_db() -> Arc<Database> {
        let db = Database::new(":memory:").await.expect("create test database");
        db.run_migrations().await.expect("run migrations");
        Arc::new(db)
    }

    #[tokio::test]
    async fn test_open_creates_open_record() {
        let db = setup_test_db().await;
        let log = RunLog::new(db.clone());

        let run = log.open().await.expect("open run");

        let stored = trawler_db::runs::get_run(db.pool(), run.id().as_str())
            .await
            .expect("query run")
            .expect("run exists");
        assert!(stored.is_open());
        assert_eq!(stored.start_time, run.started_at());

        log.finalize(run, true, 0, None).await.expect("finalize run");
    }

    #[tokio::test]
    async fn test_finalize_writes_terminal_state() {
        let db = setup_test_db().await;
        let log = RunLog::new(db.clone());

        let run = log.open().await.expect("open run");
        let id = run.id().clone();
        let outcome = log
            .finalize(run, false, 7, Some("session lost".to_string()))
            .await
            .expect("finalize run");

        assert!(!outcome.success);
        let stored = trawler_db::runs::get_run(db.pool(), id.as_str())
            .await
            .expect("query run")
            .expect("run exists");
        assert_eq!(stored.success, Some(false));
        assert_eq!(stored.listings_found, 7);
        assert_eq!(stored.error.as_deref(), Some("session lost"));
        assert!(stored.end_time.is_some());
    }
}
