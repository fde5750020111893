//! Trawler Scraper - listing scraping orchestration.
//!
//! Turns a matrix of (query, location) searches into persisted listings,
//! one page and one card at a time, over a single browser session.
//!
//! # Components
//!
//! - [`RateLimiter`] - randomized pauses at each pacing point
//! - [`RetryPolicy`] - bounded retries with exponential backoff
//! - [`Extractor`] - reads and validates one listing from the detail view
//! - [`PaginationController`] - the per-search page loop
//! - [`BatchWriter`] - chunked, idempotent persistence
//! - [`RunLog`] - run start and guaranteed terminal state
//! - [`RunOrchestrator`] - composes the above into one run
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trawler_browser::BrowserEngine;
//! use trawler_db::Database;
//! use trawler_scraper::RunOrchestrator;
//!
//! let db = Arc::new(Database::open_migrated(config.database_path()?).await?);
//! let engine = BrowserEngine::new(config.browser.clone());
//! let orchestrator = RunOrchestrator::new(config, engine, db.clone(), db);
//! let summary = orchestrator.run().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod batch;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod pacing;
pub mod pagination;
pub mod retry;
pub mod runlog;

pub use batch::BatchWriter;
pub use error::{Result, ScrapeError};
pub use extractor::{Extractor, RawListing};
pub use orchestrator::{CombinationReport, RunOrchestrator, RunSummary};
pub use pacing::{FixedJitter, JitterSource, PacingPoint, RateLimiter, ThreadRngJitter};
pub use pagination::{build_search_url, PageCursor, PaginationController};
pub use retry::RetryPolicy;
pub use runlog::{OpenRun, RunLog};
