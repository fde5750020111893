//! Scripted page capability and recording stores shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trawler_browser::{BrowserError, PageActions, PageSession, SessionLauncher};
use trawler_core::{AppConfig, PacingConfig, SelectorConfig};
use trawler_db::{DatabaseError, ListingStore, RunOutcome, RunRecord, RunStore, StoredListing};
use url::Url;

/// What the fake source renders.
#[derive(Debug, Clone, Default)]
pub struct SourcePlan {
    /// Cards on each results page, page 1 first. Every search sees the same layout.
    pub cards_per_page: Vec<usize>,
    /// Navigations that fail before the first one succeeds.
    pub navigation_failures: usize,
    /// Searches whose keywords contain one of these never load.
    pub broken_keywords: Vec<String>,
    /// Searches whose keywords contain this crash the page.
    pub panic_keywords: Option<String>,
    /// Card ids rendered without a company name.
    pub incomplete: HashSet<String>,
    /// Listing reads that fail because the detail view re-rendered mid-read.
    pub read_failures: usize,
}

impl SourcePlan {
    pub fn pages(cards_per_page: &[usize]) -> Self {
        Self {
            cards_per_page: cards_per_page.to_vec(),
            ..Self::default()
        }
    }
}

/// Everything the fake page saw.
#[derive(Debug, Default)]
pub struct PageLog {
    pub navigations: Vec<String>,
    pub failed_navigations: usize,
    pub failed_reads: usize,
    pub clicks: usize,
    pub launches: usize,
    pub closes: usize,
    current: Option<(String, u32)>,
    selected: Option<String>,
}

impl PageLog {
    pub fn navigated_pages(&self) -> Vec<u32> {
        self.navigations
            .iter()
            .filter_map(|url| query_value(url, "pageNum"))
            .filter_map(|page| page.parse().ok())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FakeCard {
    pub id: String,
}

pub fn card_id(keywords: &str, page: u32, index: usize) -> String {
    let slug = keywords.to_lowercase().replace(' ', "-");
    format!("{slug}-p{page}-c{index}")
}

fn query_value(url: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let value = parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned());
    value
}

pub struct FakePage {
    plan: SourcePlan,
    selectors: SelectorConfig,
    log: Arc<Mutex<PageLog>>,
}

impl FakePage {
    pub fn new(plan: SourcePlan) -> Self {
        Self {
            plan,
            selectors: SelectorConfig::default(),
            log: Arc::new(Mutex::new(PageLog::default())),
        }
    }

    pub fn log(&self) -> Arc<Mutex<PageLog>> {
        Arc::clone(&self.log)
    }

    fn cards_on_current_page(&self) -> Vec<FakeCard> {
        let log = self.log.lock().unwrap();
        let Some((keywords, page)) = &log.current else {
            return Vec::new();
        };
        let count = usize::try_from(*page)
            .ok()
            .and_then(|p| self.plan.cards_per_page.get(p - 1))
            .copied()
            .unwrap_or(0);
        (0..count)
            .map(|i| FakeCard {
                id: card_id(keywords, *page, i),
            })
            .collect()
    }
}

#[async_trait]
impl PageActions for FakePage {
    type Element = FakeCard;

    async fn navigate(&self, url: &str, _timeout: Duration) -> trawler_browser::Result<()> {
        let keywords = query_value(url, "keywords").unwrap_or_default();
        let page = query_value(url, "pageNum")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1);

        if let Some(marker) = &self.plan.panic_keywords {
            if keywords.contains(marker.as_str()) {
                panic!("renderer crashed on {keywords}");
            }
        }

        let mut log = self.log.lock().unwrap();
        log.navigations.push(url.to_string());
        log.current = None;
        log.selected = None;

        if self
            .plan
            .broken_keywords
            .iter()
            .any(|k| keywords.contains(k.as_str()))
        {
            log.failed_navigations += 1;
            return Err(BrowserError::Timeout(format!("{url} never finished loading")));
        }
        if log.failed_navigations < self.plan.navigation_failures {
            log.failed_navigations += 1;
            return Err(BrowserError::NavigationError(format!(
                "{url}: net::ERR_CONNECTION_RESET"
            )));
        }

        log.current = Some((keywords, page));
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> trawler_browser::Result<Vec<FakeCard>> {
        let found = self.query_all(selector).await?;
        if found.is_empty() {
            return Err(BrowserError::Timeout(format!("{selector} never appeared")));
        }
        Ok(found)
    }

    async fn query_all(&self, selector: &str) -> trawler_browser::Result<Vec<FakeCard>> {
        if selector == self.selectors.card {
            return Ok(self.cards_on_current_page());
        }
        if selector == self.selectors.detail_view {
            let log = self.log.lock().unwrap();
            return Ok(log
                .selected
                .iter()
                .map(|id| FakeCard { id: id.clone() })
                .collect());
        }
        Ok(Vec::new())
    }

    async fn evaluate(&self, script: &str) -> trawler_browser::Result<Value> {
        let mut log = self.log.lock().unwrap();

        if script.contains("hasAttribute('disabled')") {
            let has_next = log.current.as_ref().is_some_and(|(_, page)| {
                usize::try_from(*page).is_ok_and(|p| p < self.plan.cards_per_page.len())
            });
            return Ok(Value::Bool(has_next));
        }

        if script.contains("window.location.href") {
            if log.failed_reads < self.plan.read_failures {
                log.failed_reads += 1;
                return Err(BrowserError::EvaluationError(
                    "Execution context was destroyed".to_string(),
                ));
            }
            let Some(id) = &log.selected else {
                return Ok(Value::Null);
            };
            let company = if self.plan.incomplete.contains(id) {
                ""
            } else {
                "Acme"
            };
            return Ok(json!({
                "id": id,
                "title": format!("Engineer {id}"),
                "company": company,
                "location": "Remote",
                "description": "Build scrapers",
                "salary": null,
                "jobType": "Full-time",
                "postedDate": "1 day ago",
                "url": format!("https://example.com/jobs/{id}"),
            }));
        }

        Ok(Value::Null)
    }

    async fn click(&self, element: &FakeCard) -> trawler_browser::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.clicks += 1;
        log.selected = Some(element.id.clone());
        Ok(())
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn close(&mut self) -> trawler_browser::Result<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Hands out fake pages that share one log.
pub struct FakeLauncher {
    plan: SourcePlan,
    log: Arc<Mutex<PageLog>>,
    fail: bool,
    panic: bool,
}

impl FakeLauncher {
    pub fn new(plan: SourcePlan) -> Self {
        Self {
            plan,
            log: Arc::new(Mutex::new(PageLog::default())),
            fail: false,
            panic: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(SourcePlan::default())
        }
    }

    /// A launcher whose driver crashes outright.
    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::new(SourcePlan::default())
        }
    }

    pub fn log(&self) -> Arc<Mutex<PageLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakePage;

    async fn launch(&self) -> trawler_browser::Result<FakePage> {
        self.log.lock().unwrap().launches += 1;
        if self.panic {
            panic!("browser driver crashed during launch");
        }
        if self.fail {
            return Err(BrowserError::ChromiumError(
                "could not find a Chrome executable".to_string(),
            ));
        }
        Ok(FakePage {
            plan: self.plan.clone(),
            selectors: SelectorConfig::default(),
            log: Arc::clone(&self.log),
        })
    }
}

/// Listing store that records every bulk write.
#[derive(Clone, Default)]
pub struct RecordingListingStore {
    pub batches: Arc<Mutex<Vec<Vec<StoredListing>>>>,
    pub purges: Arc<Mutex<usize>>,
}

impl RecordingListingStore {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|item| item.listing.id.clone())
            .collect()
    }
}

#[async_trait]
impl ListingStore for RecordingListingStore {
    async fn batch_put_listings(&self, items: &[StoredListing]) -> trawler_db::Result<()> {
        self.batches.lock().unwrap().push(items.to_vec());
        Ok(())
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> trawler_db::Result<u64> {
        *self.purges.lock().unwrap() += 1;
        Ok(0)
    }
}

/// Run store that keeps records in memory and refuses a second terminal write.
#[derive(Clone, Default)]
pub struct MemoryRunStore {
    pub runs: Arc<Mutex<HashMap<String, RunRecord>>>,
    pub finalize_calls: Arc<Mutex<usize>>,
}

impl MemoryRunStore {
    pub fn only_run(&self) -> RunRecord {
        let runs = self.runs.lock().unwrap();
        assert_eq!(runs.len(), 1, "exactly one run record per invocation");
        runs.values().next().cloned().unwrap()
    }

    pub fn finalize_calls(&self) -> usize {
        *self.finalize_calls.lock().unwrap()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create_run(&self, run: &RunRecord) -> trawler_db::Result<()> {
        self.runs
            .lock()
            .unwrap()
            .insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn finalize_run(&self, id: &str, outcome: &RunOutcome) -> trawler_db::Result<()> {
        *self.finalize_calls.lock().unwrap() += 1;
        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .get_mut(id)
            .ok_or_else(|| DatabaseError::NotFoundWithMessage(format!("Run '{id}' not found")))?;
        if !run.is_open() {
            return Err(DatabaseError::AlreadyFinalized(id.to_string()));
        }
        run.end_time = Some(outcome.end_time);
        run.success = Some(outcome.success);
        run.listings_found = outcome.listings_found;
        run.error.clone_from(&outcome.error);
        Ok(())
    }
}

/// Configuration with no pacing delays for the given search matrix.
pub fn test_config(queries: &[&str], locations: &[&str], max_jobs: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.search.queries = queries.iter().map(|q| (*q).to_string()).collect();
    config.search.locations = locations.iter().map(|l| (*l).to_string()).collect();
    config.search.max_jobs_per_run = max_jobs;
    config.pacing = PacingConfig::zero();
    config
}
