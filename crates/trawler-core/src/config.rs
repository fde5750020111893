//! Configuration management for Trawler.
//!
//! Provides TOML-based configuration with XDG-compliant paths. The loaded
//! [`AppConfig`] is passed explicitly into the scraper; core components never
//! read the process environment themselves.

use crate::error::{ConfigError, ConfigResult};
use crate::types::SearchCombination;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest chunk accepted by a single bulk write.
pub const MAX_BATCH_SIZE: usize = 25;

/// Main application configuration.
///
/// This is loaded from `~/.config/trawler/config.toml` (or platform equivalent)
/// unless an explicit path is given. Missing sections fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Search matrix and per-combination limits
    pub search: SearchConfig,
    /// Retry budgets and backoff base
    pub retry: RetryConfig,
    /// Randomized pacing windows
    pub pacing: PacingConfig,
    /// Browser session settings
    pub browser: BrowserConfig,
    /// Persistence settings
    pub storage: StorageConfig,
    /// Run-level settings
    pub run: RunConfig,
    /// CSS selectors used to read the source markup
    pub selectors: SelectorConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of a loaded configuration.
    ///
    /// Supports the following environment variables:
    /// - `TRAWLER_HEADLESS`: Override browser headless mode (true/false)
    /// - `TRAWLER_DATABASE_PATH`: Override the database file location
    /// - `TRAWLER_MAX_JOBS`: Override `search.max_jobs_per_run`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("TRAWLER_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("TRAWLER_DATABASE_PATH") {
            tracing::debug!("Override storage.database_path from env: {}", val);
            self.storage.database_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("TRAWLER_MAX_JOBS") {
            if let Ok(max) = val.parse() {
                self.search.max_jobs_per_run = max;
                tracing::debug!("Override search.max_jobs_per_run from env: {}", max);
            }
        }

        self
    }

    /// Save configuration to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check the values the scraper relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.search.queries.iter().all(|q| q.trim().is_empty()) {
            return Err(invalid("search.queries", "at least one query is required"));
        }
        if self.search.locations.iter().all(|l| l.trim().is_empty()) {
            return Err(invalid("search.locations", "at least one location is required"));
        }
        if self.search.max_jobs_per_run == 0 {
            return Err(invalid("search.max_jobs_per_run", "must be greater than 0"));
        }
        if self.search.results_per_page == 0 {
            return Err(invalid("search.results_per_page", "must be greater than 0"));
        }
        if self.retry.max_retries == 0 {
            return Err(invalid("retry.max_retries", "must be greater than 0"));
        }
        if self.storage.max_batch_size == 0 || self.storage.max_batch_size > MAX_BATCH_SIZE {
            return Err(invalid(
                "storage.max_batch_size",
                &format!("must be between 1 and {MAX_BATCH_SIZE}"),
            ));
        }
        if self.selectors.card.trim().is_empty() {
            return Err(invalid("selectors.card", "must not be empty"));
        }
        Ok(())
    }

    /// Resolve the database file, defaulting to the XDG data directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("trawler.db")),
        }
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/trawler/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("dev", "trawler", "trawler").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/trawler`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("dev", "trawler", "trawler").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Search matrix settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search queries, iterated in order
    pub queries: Vec<String>,
    /// Locations, iterated in order for each query
    pub locations: Vec<String>,
    /// Maximum listings collected per combination
    pub max_jobs_per_run: usize,
    /// Search endpoint the page URLs are built from
    pub base_url: String,
    /// Listings per result page (drives the `start` offset)
    pub results_per_page: u32,
}

impl SearchConfig {
    /// The query×location matrix in its fixed iteration order.
    #[must_use]
    pub fn combinations(&self) -> Vec<SearchCombination> {
        self.queries
            .iter()
            .filter(|q| !q.trim().is_empty())
            .flat_map(|query| {
                self.locations
                    .iter()
                    .filter(|l| !l.trim().is_empty())
                    .map(move |location| SearchCombination::new(query.clone(), location.clone()))
            })
            .collect()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            queries: vec!["software engineer".to_string()],
            locations: vec!["United States".to_string()],
            max_jobs_per_run: 100,
            base_url: "https://www.linkedin.com/jobs/search/".to_string(),
            results_per_page: 25,
        }
    }
}

/// Retry budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts for page navigation
    pub max_retries: u32,
    /// Backoff base in milliseconds; attempt `i` waits `base * 2^i`
    pub base_delay_ms: u64,
    /// Attempts for activating a card and awaiting its detail view
    pub detail_attempts: u32,
    /// Attempts for waiting on the card list of a page
    pub card_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            detail_attempts: 3,
            card_attempts: 3,
        }
    }
}

/// A uniform random delay window `[min_ms, min_ms + spread_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayWindow {
    /// Lower bound in milliseconds
    pub min_ms: u64,
    /// Width of the window in milliseconds
    pub spread_ms: u64,
}

impl DelayWindow {
    /// Create a window.
    #[must_use]
    pub const fn new(min_ms: u64, spread_ms: u64) -> Self {
        Self { min_ms, spread_ms }
    }

    /// A window that never waits.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }
}

/// Pacing windows for each point where the scraper pauses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Before the first page of a combination
    pub pre_search: DelayWindow,
    /// After a page loads, before looking for cards
    pub page_settle: DelayWindow,
    /// Before navigating to the next page
    pub inter_page: DelayWindow,
    /// Before each card is extracted
    pub inter_card: DelayWindow,
    /// Between two combinations
    pub inter_search: DelayWindow,
}

impl PacingConfig {
    /// Pacing that never waits, for tests and dry runs.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            pre_search: DelayWindow::zero(),
            page_settle: DelayWindow::zero(),
            inter_page: DelayWindow::zero(),
            inter_card: DelayWindow::zero(),
            inter_search: DelayWindow::zero(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            pre_search: DelayWindow::new(1000, 2000),
            page_settle: DelayWindow::new(2000, 3000),
            inter_page: DelayWindow::new(3000, 5000),
            inter_card: DelayWindow::new(500, 1500),
            inter_search: DelayWindow::new(5000, 10_000),
        }
    }
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// How long to wait for the card list of a page
    pub card_timeout_secs: u64,
    /// How long to wait for a detail view after activating a card
    pub detail_timeout_secs: u64,
    /// Fixed user agent; a common desktop agent is picked when unset
    pub user_agent: Option<String>,
    /// Chrome/Chromium executable; auto-detected when unset
    pub executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            card_timeout_secs: 10,
            detail_timeout_secs: 5,
            user_agent: None,
            executable: None,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `SQLite` database file; defaults to the XDG data directory
    pub database_path: Option<PathBuf>,
    /// Days a stored listing is kept before it expires
    pub retention_days: u32,
    /// Listings per bulk write (at most 25)
    pub max_batch_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            retention_days: 30,
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

/// Run-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Cancel the run after this many seconds
    pub timeout_secs: Option<u64>,
}

/// CSS selectors for the source markup.
///
/// Field lookups are priority-ordered: the first selector yielding a
/// non-empty value wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One listing card in the result list
    pub card: String,
    /// Detail view rendered after a card is activated
    pub detail_view: String,
    /// Pagination "next" button
    pub next_button: String,
    /// Elements carrying the `data-job-id` attribute, in priority order
    pub id_sources: Vec<String>,
    /// Title lookups
    pub title: Vec<String>,
    /// Organization name lookups
    pub company: Vec<String>,
    /// Location lookups
    pub location: Vec<String>,
    /// Description lookups
    pub description: Vec<String>,
    /// Salary lookups
    pub salary: Vec<String>,
    /// Employment type lookups
    pub job_type: Vec<String>,
    /// Posted date lookups
    pub posted_date: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        Self {
            card: ".job-card-container".to_string(),
            detail_view: ".job-view-layout".to_string(),
            next_button: "button.next".to_string(),
            id_sources: list(&["[data-job-id]", ".job-view-layout"]),
            title: list(&[
                "h1.job-details-jobs-unified-top-card__job-title",
                ".job-details-jobs-unified-top-card__job-title",
            ]),
            company: list(&[
                ".job-details-jobs-unified-top-card__company-name",
                r#"a[data-tracking-control-name="public_jobs_unified-top-card-job-company-name"]"#,
            ]),
            location: list(&[
                ".job-details-jobs-unified-top-card__bullet",
                r#"[data-tracking-control-name="public_jobs_unified-top-card-job-location"]"#,
            ]),
            description: list(&[
                r#".job-view-layout [data-tracking-control-name="public_jobs_unified-top-card-job-details"]"#,
                ".job-details-jobs-unified-top-card__description-container",
            ]),
            salary: list(&[".job-details-jobs-unified-top-card__salary-range"]),
            job_type: list(&[".job-details-jobs-unified-top-card__job-type"]),
            posted_date: list(&[".job-details-jobs-unified-top-card__posted-date"]),
        }
    }
}
