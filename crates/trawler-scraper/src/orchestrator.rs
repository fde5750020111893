//! Top-level run composition.
//!
//! One run opens a run record, acquires a single browser session, scrapes
//! every configured search in order and persists each search's listings
//! before moving on. The session is released and the run record finalized
//! whatever happens in between, including panics.

use crate::batch::BatchWriter;
use crate::error::{Result, ScrapeError};
use crate::pacing::{PacingPoint, RateLimiter};
use crate::pagination::PaginationController;
use crate::runlog::RunLog;
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio_util::sync::CancellationToken;
use trawler_browser::{PageActions, PageSession, SessionLauncher};
use trawler_core::{AppConfig, RunId, SearchCombination};
use trawler_db::{ListingStore, RunStore};

/// Outcome of one search within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinationReport {
    /// The search
    pub combination: SearchCombination,
    /// Listings persisted for it
    pub listings: usize,
    /// Why the search was abandoned, if it was
    pub error: Option<String>,
}

impl CombinationReport {
    /// Whether the search completed.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a whole run, as recorded in the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Run identifier
    pub run_id: RunId,
    /// Terminal state written to the run log
    pub success: bool,
    /// Listings persisted by the run
    pub listings_found: u32,
    /// Identifiers of the persisted listings, in persistence order
    pub listing_ids: Vec<String>,
    /// Per-search outcomes, in iteration order
    pub combinations: Vec<CombinationReport>,
    /// Run-level fault, for failed runs
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct RunProgress {
    listing_ids: Vec<String>,
    reports: Vec<CombinationReport>,
}

impl RunProgress {
    fn listings_found(&self) -> u32 {
        u32::try_from(self.listing_ids.len()).unwrap_or(u32::MAX)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with a non-string payload".to_string())
}

/// Runs the configured search matrix end to end.
pub struct RunOrchestrator<L, LS, RS> {
    config: AppConfig,
    launcher: L,
    writer: BatchWriter<LS>,
    run_log: RunLog<RS>,
    pacer: RateLimiter,
    cancel: CancellationToken,
}

impl<L, LS, RS> RunOrchestrator<L, LS, RS>
where
    L: SessionLauncher,
    LS: ListingStore,
    RS: RunStore,
{
    /// Create an orchestrator with randomized pacing from `config`.
    pub fn new(config: AppConfig, launcher: L, listings: LS, runs: RS) -> Self {
        let writer = BatchWriter::new(
            listings,
            config.storage.max_batch_size,
            config.storage.retention_days,
        );
        Self {
            pacer: RateLimiter::new(config.pacing.clone()),
            writer,
            run_log: RunLog::new(runs),
            launcher,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the pacing source.
    #[must_use]
    pub fn with_rate_limiter(mut self, pacer: RateLimiter) -> Self {
        self.pacer = pacer;
        self
    }

    /// Stop the run between steps once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this orchestrator's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute one run.
    ///
    /// Failed searches, including ones that panic, are logged and skipped;
    /// the run still succeeds. The run fails when the browser session cannot
    /// be acquired, when it is cancelled, or on a panic outside a search.
    ///
    /// # Errors
    /// Returns an error only if the run record cannot be opened or finalized.
    pub async fn run(&self) -> Result<RunSummary> {
        let run = self.run_log.open().await?;
        let run_id = run.id().clone();

        self.purge_expired().await;

        let mut progress = RunProgress::default();
        let result = AssertUnwindSafe(self.execute(&mut progress))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ScrapeError::Panicked(panic_message(panic.as_ref()))));

        let error = result.err().map(|e| e.to_string());
        let success = error.is_none();
        let listings_found = progress.listings_found();

        self.run_log
            .finalize(run, success, listings_found, error.clone())
            .await?;

        Ok(RunSummary {
            run_id,
            success,
            listings_found,
            listing_ids: progress.listing_ids,
            combinations: progress.reports,
            error,
        })
    }

    async fn purge_expired(&self) {
        match self.writer.store().purge_expired(Utc::now()).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!("Purged {} expired listings", removed),
            Err(e) => tracing::warn!("Failed to purge expired listings: {}", e),
        }
    }

    async fn execute(&self, progress: &mut RunProgress) -> Result<()> {
        let mut session = self
            .launcher
            .launch()
            .await
            .map_err(|e| ScrapeError::Session(e.to_string()))?;

        let controller =
            PaginationController::new(&self.config, self.pacer.clone(), self.cancel.clone());
        let scraped = AssertUnwindSafe(self.scrape_all(&controller, &session, progress))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ScrapeError::Panicked(panic_message(panic.as_ref()))));

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }

        scraped
    }

    async fn scrape_all<P: PageActions>(
        &self,
        controller: &PaginationController,
        page: &P,
        progress: &mut RunProgress,
    ) -> Result<()> {
        let combinations = self.config.search.combinations();
        let total = combinations.len();

        for (index, combination) in combinations.into_iter().enumerate() {
            if index > 0 {
                self.pacer
                    .pause(PacingPoint::InterSearch, &self.cancel)
                    .await?;
            }
            tracing::info!("Search {}/{}: {}", index + 1, total, combination);

            let report = AssertUnwindSafe(self.scrape_combination(
                controller,
                page,
                combination.clone(),
                progress,
            ))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let error = ScrapeError::Panicked(panic_message(panic.as_ref()));
                tracing::error!("Abandoning search {}: {}", combination, error);
                Ok(CombinationReport {
                    combination,
                    listings: 0,
                    error: Some(error.to_string()),
                })
            })?;
            progress.reports.push(report);
        }

        Ok(())
    }

    /// Scrape and persist one search. Only cancellation escapes.
    async fn scrape_combination<P: PageActions>(
        &self,
        controller: &PaginationController,
        page: &P,
        combination: SearchCombination,
        progress: &mut RunProgress,
    ) -> Result<CombinationReport> {
        let records = match controller.scrape(page, &combination).await {
            Ok(records) => records,
            Err(ScrapeError::Cancelled) => return Err(ScrapeError::Cancelled),
            Err(e) => {
                tracing::warn!("Abandoning search {}: {}", combination, e);
                return Ok(CombinationReport {
                    combination,
                    listings: 0,
                    error: Some(e.to_string()),
                });
            }
        };

        let (written, error) = match self.writer.persist(&records).await {
            Ok(written) => (written, None),
            Err(e) => {
                tracing::error!("Failed to persist listings for {}: {}", combination, e);
                let written = match &e {
                    ScrapeError::BatchWrite { written, .. } => *written,
                    _ => 0,
                };
                (written, Some(e.to_string()))
            }
        };

        progress
            .listing_ids
            .extend(records.into_iter().take(written).map(|listing| listing.id));

        Ok(CombinationReport {
            combination,
            listings: written,
            error,
        })
    }
}
