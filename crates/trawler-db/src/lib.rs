//! Trawler Database Layer
//!
//! `SQLite` storage for scraped listings and per-run accounting, built on
//! `SQLx` with embedded migrations.
//!
//! # Architecture
//!
//! - **Listings**: bulk upserts keyed by listing id, each row stamped with
//!   a creation time and an expiry used by [`listings::purge_expired`]
//! - **Runs**: one row per orchestrator invocation, written open and
//!   finalized exactly once
//! - **Store traits**: [`ListingStore`] and [`RunStore`] are the seams the
//!   scraper writes through
//!
//! # Example
//!
//! ```ignore
//! use trawler_db::Database;
//!
//! let db = Database::new("trawler.db").await?;
//! db.run_migrations().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod listings;
pub mod migrations;
pub mod runs;
pub mod store;

pub use error::{DatabaseError, Result};
pub use listings::StoredListing;
pub use runs::{RunOutcome, RunRecord};
pub use store::{ListingStore, RunStore};

use sqlx::{Pool, Sqlite};
use std::path::Path;

/// High-level database handle owning the connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Arguments
    /// * `path` - Path to the database file (or `:memory:` for in-memory)
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        Ok(Self { pool })
    }

    /// Open the database and bring its schema up to date.
    pub async fn open_migrated(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(path).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
