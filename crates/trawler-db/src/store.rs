//! Storage capability traits consumed by the scraper.
//!
//! [`Database`] implements both traits against `SQLite`. Tests substitute
//! in-memory fakes.

use crate::error::Result;
use crate::listings::{self, StoredListing};
use crate::runs::{self, RunOutcome, RunRecord};
use crate::Database;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Bulk, idempotent listing writes.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Write at most 25 listings as one unit, overwriting by identifier.
    async fn batch_put_listings(&self, items: &[StoredListing]) -> Result<()>;

    /// Remove listings that expired at or before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Run lifecycle persistence.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert an open run.
    async fn create_run(&self, run: &RunRecord) -> Result<()>;

    /// Move an open run to its terminal state. Fails if it is not open.
    async fn finalize_run(&self, id: &str, outcome: &RunOutcome) -> Result<()>;
}

#[async_trait]
impl ListingStore for Database {
    async fn batch_put_listings(&self, items: &[StoredListing]) -> Result<()> {
        listings::batch_put(self.pool(), items).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        listings::purge_expired(self.pool(), now).await
    }
}

#[async_trait]
impl RunStore for Database {
    async fn create_run(&self, run: &RunRecord) -> Result<()> {
        runs::create_run(self.pool(), run).await
    }

    async fn finalize_run(&self, id: &str, outcome: &RunOutcome) -> Result<()> {
        runs::finalize_run(self.pool(), id, outcome).await
    }
}

#[async_trait]
impl<T: ListingStore + ?Sized> ListingStore for Arc<T> {
    async fn batch_put_listings(&self, items: &[StoredListing]) -> Result<()> {
        (**self).batch_put_listings(items).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        (**self).purge_expired(now).await
    }
}

#[async_trait]
impl<T: RunStore + ?Sized> RunStore for Arc<T> {
    async fn create_run(&self, run: &RunRecord) -> Result<()> {
        (**self).create_run(run).await
    }

    async fn finalize_run(&self, id: &str, outcome: &RunOutcome) -> Result<()> {
        (**self).finalize_run(id, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trawler_core::{ListingRecord, RunId};

    #[tokio::test]
    async fn test_shared_database_serves_both_stores() {
        let db = Database::new(":memory:").await.expect("create test database");
        db.run_migrations().await.expect("run migrations");
        let db = Arc::new(db);

        let run = RunRecord::open(&RunId::generate(), Utc::now());
        RunStore::create_run(&db, &run).await.expect("create run");

        let item = StoredListing::stamp(
            ListingRecord {
                id: "42".to_string(),
                title: "Engineer".to_string(),
                company: "Acme".to_string(),
                location: "Berlin".to_string(),
                description: String::new(),
                salary: None,
                job_type: None,
                posted_date: String::new(),
                url: "https://example.com/jobs/42".to_string(),
            },
            Utc::now(),
            30,
        );
        db.batch_put_listings(&[item]).await.expect("write listing");

        let outcome = RunOutcome {
            end_time: Utc::now(),
            success: true,
            listings_found: 1,
            error: None,
        };
        RunStore::finalize_run(&db, &run.id, &outcome)
            .await
            .expect("finalize run");

        assert_eq!(listings::count(db.pool()).await.expect("count"), 1);
        let stored = runs::get_run(db.pool(), &run.id)
            .await
            .expect("query run")
            .expect("run exists");
        assert_eq!(stored.success, Some(true));
    }
}
