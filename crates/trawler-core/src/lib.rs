//! Trawler Core - Foundation crate for the Trawler listing scraper.
//!
//! This crate provides the shared types, error handling and configuration
//! management that all other Trawler crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared domain types (`ListingRecord`, `SearchCombination`, `RunId`)
//!
//! # Example
//!
//! ```rust
//! use trawler_core::AppConfig;
//!
//! let config = AppConfig::default();
//! for combination in config.search.combinations() {
//!     println!("{} in {}", combination.query, combination.location);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DelayWindow, PacingConfig, RetryConfig, RunConfig, SearchConfig,
    SelectorConfig, StorageConfig,
};
pub use error::{ConfigError, ConfigResult, Result, TrawlerError};
pub use types::{ListingRecord, RunId, SearchCombination};
