//! The per-search scraping loop.
//!
//! ```text
//! Init -> FetchingPage -> ExtractingCards -> DecidingNextPage -> FetchingPage
//!                                                              -> Done
//! any step exhausting its retries                              -> Failed
//! ```

use crate::error::{Result, ScrapeError};
use crate::extractor::Extractor;
use crate::pacing::{PacingPoint, RateLimiter};
use crate::retry::RetryPolicy;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trawler_browser::PageActions;
use trawler_core::{AppConfig, ListingRecord, SearchCombination};
use url::Url;

/// Build the results URL for one page of a search.
///
/// # Errors
/// Returns `ScrapeError::Url` if `base_url` is not an absolute URL.
pub fn build_search_url(
    base_url: &str,
    combination: &SearchCombination,
    page: u32,
    results_per_page: u32,
) -> Result<String> {
    let start = page.saturating_sub(1).saturating_mul(results_per_page);

    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut()
        .append_pair("keywords", &combination.keywords())
        .append_pair("start", &start.to_string())
        .append_pair("position", "1")
        .append_pair("pageNum", &page.to_string());

    Ok(url.into())
}

fn next_page_script(next_button: &str) -> String {
    let selector = serde_json::to_string(next_button).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ const button = document.querySelector({selector}); \
         return button !== null && !button.hasAttribute('disabled'); }})()"
    )
}

/// Position within one search.
#[derive(Debug, Clone, Default)]
pub struct PageCursor {
    /// 1-based page number
    pub page: u32,
    /// Records accepted so far, in encounter order
    pub records: Vec<ListingRecord>,
}

impl PageCursor {
    fn new() -> Self {
        Self {
            page: 1,
            records: Vec::new(),
        }
    }

    fn is_full(&self, max: usize) -> bool {
        self.records.len() >= max
    }
}

#[derive(Debug)]
enum PageState {
    Init,
    FetchingPage,
    ExtractingCards,
    DecidingNextPage,
    Done,
    Failed(ScrapeError),
}

/// Drives one search across its result pages.
#[derive(Debug, Clone)]
pub struct PaginationController {
    base_url: String,
    results_per_page: u32,
    max_jobs: usize,
    card_selector: String,
    next_page_script: String,
    navigation_timeout: Duration,
    card_timeout: Duration,
    navigation_retry: RetryPolicy,
    card_retry: RetryPolicy,
    extractor: Extractor,
    pacer: RateLimiter,
    cancel: CancellationToken,
}

impl PaginationController {
    /// Create a controller from the application configuration.
    pub fn new(config: &AppConfig, pacer: RateLimiter, cancel: CancellationToken) -> Self {
        let retry = RetryPolicy::from_config(&config.retry).with_cancellation(cancel.clone());
        let extractor = Extractor::new(
            &config.selectors,
            Duration::from_secs(config.browser.detail_timeout_secs),
            retry.clone().with_attempts(config.retry.detail_attempts),
        );

        Self {
            base_url: config.search.base_url.clone(),
            results_per_page: config.search.results_per_page,
            max_jobs: config.search.max_jobs_per_run,
            card_selector: config.selectors.card.clone(),
            next_page_script: next_page_script(&config.selectors.next_button),
            navigation_timeout: Duration::from_secs(config.browser.navigation_timeout_secs),
            card_timeout: Duration::from_secs(config.browser.card_timeout_secs),
            card_retry: retry.clone().with_attempts(config.retry.card_attempts),
            navigation_retry: retry,
            extractor,
            pacer,
            cancel,
        }
    }

    /// Most records returned for one search.
    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    /// Scrape one search, returning at most [`max_jobs`](Self::max_jobs)
    /// records in encounter order.
    ///
    /// # Errors
    /// Returns the fault of the step that exhausted its retries, or
    /// `ScrapeError::Cancelled`. Records gathered before the fault are dropped.
    pub async fn scrape<P: PageActions>(
        &self,
        page: &P,
        combination: &SearchCombination,
    ) -> Result<Vec<ListingRecord>> {
        let mut cursor = PageCursor::new();
        let mut state = PageState::Init;

        loop {
            state = match state {
                PageState::Done => {
                    tracing::info!(
                        query = %combination.query,
                        location = %combination.location,
                        pages = cursor.page,
                        "Search finished with {} listings",
                        cursor.records.len()
                    );
                    return Ok(cursor.records);
                }
                PageState::Failed(e) => {
                    tracing::warn!(
                        query = %combination.query,
                        location = %combination.location,
                        page = cursor.page,
                        "Search failed: {}",
                        e
                    );
                    return Err(e);
                }
                current => self
                    .advance(current, page, combination, &mut cursor)
                    .await
                    .unwrap_or_else(PageState::Failed),
            };
        }
    }

    async fn advance<P: PageActions>(
        &self,
        state: PageState,
        page: &P,
        combination: &SearchCombination,
        cursor: &mut PageCursor,
    ) -> Result<PageState> {
        if self.cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        match state {
            PageState::Init => {
                tracing::info!(
                    query = %combination.query,
                    location = %combination.location,
                    "Starting search"
                );
                self.pacer.pause(PacingPoint::PreSearch, &self.cancel).await?;
                Ok(PageState::FetchingPage)
            }
            PageState::FetchingPage => {
                let url = build_search_url(
                    &self.base_url,
                    combination,
                    cursor.page,
                    self.results_per_page,
                )?;
                self.fetch_page(page, &url).await?;
                tracing::debug!(page = cursor.page, %url, "Fetched results page");
                Ok(PageState::ExtractingCards)
            }
            PageState::ExtractingCards => {
                self.extract_cards(page, cursor).await?;
                Ok(PageState::DecidingNextPage)
            }
            PageState::DecidingNextPage => {
                if cursor.is_full(self.max_jobs) || !self.has_next_page(page).await {
                    return Ok(PageState::Done);
                }
                cursor.page += 1;
                self.pacer.pause(PacingPoint::InterPage, &self.cancel).await?;
                Ok(PageState::FetchingPage)
            }
            terminal => Ok(terminal),
        }
    }

    async fn fetch_page<P: PageActions>(&self, page: &P, url: &str) -> Result<()> {
        self.navigation_retry
            .execute("navigate to results page", || async move {
                page.navigate(url, self.navigation_timeout)
                    .await
                    .map_err(ScrapeError::from)
            })
            .await?;

        // Results render after load; give the list time to settle.
        self.pacer.pause(PacingPoint::PageSettle, &self.cancel).await
    }

    async fn extract_cards<P: PageActions>(&self, page: &P, cursor: &mut PageCursor) -> Result<()> {
        let cards = self
            .card_retry
            .execute("wait for listing cards", || async move {
                let cards = page
                    .wait_for_selector(&self.card_selector, self.card_timeout)
                    .await?;
                if cards.is_empty() {
                    return Err(ScrapeError::NoCards(self.card_selector.clone()));
                }
                Ok::<_, ScrapeError>(cards)
            })
            .await?;

        tracing::debug!(page = cursor.page, cards = cards.len(), "Listing cards rendered");

        for card in &cards {
            if cursor.is_full(self.max_jobs) {
                break;
            }
            self.pacer.pause(PacingPoint::InterCard, &self.cancel).await?;

            if let Some(listing) = self.extractor.extract(page, card).await? {
                cursor.records.push(listing);
            }
        }

        Ok(())
    }

    async fn has_next_page<P: PageActions>(&self, page: &P) -> bool {
        match page.evaluate(&self.next_page_script).await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                tracing::warn!("Could not check for a next page: {}", e);
                false
            }
        }
    }
}
