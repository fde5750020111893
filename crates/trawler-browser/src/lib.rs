//! Browser automation for dynamically rendered listing sources.
//!
//! Defines the page capability the scraper drives ([`PageActions`]) and a
//! headless Chromium implementation with anti-fingerprinting hardening.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::{PageActions, PageSession, SessionLauncher};
pub use engine::{BrowserEngine, BrowserSession};
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
