//! Chunked persistence of scraped listings through a [`ListingStore`].

use crate::error::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use trawler_core::config::MAX_BATCH_SIZE;
use trawler_core::ListingRecord;
use trawler_db::{ListingStore, StoredListing};

/// Persists listings in bounded, idempotent chunks.
///
/// Chunks are written in order and the first failure stops the write.
/// Chunks written before it stay persisted.
#[derive(Debug, Clone)]
pub struct BatchWriter<S> {
    store: S,
    max_batch_size: usize,
    retention_days: u32,
}

impl<S: ListingStore> BatchWriter<S> {
    /// Create a writer. `max_batch_size` is clamped to `1..=25`.
    pub fn new(store: S, max_batch_size: usize, retention_days: u32) -> Self {
        Self {
            store,
            max_batch_size: max_batch_size.clamp(1, MAX_BATCH_SIZE),
            retention_days,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist `records` stamped with the current time.
    pub async fn persist(&self, records: &[ListingRecord]) -> Result<usize> {
        self.persist_at(records, Utc::now()).await
    }

    /// Persist `records` stamped with `created_at`, returning how many were written.
    ///
    /// # Errors
    /// Returns `ScrapeError::BatchWrite` naming the failed chunk.
    pub async fn persist_at(&self, records: &[ListingRecord], created_at: DateTime<Utc>) -> Result<usize> {
        let chunks = records.len().div_ceil(self.max_batch_size);
        let mut written = 0;

        for (index, chunk) in records.chunks(self.max_batch_size).enumerate() {
            let items: Vec<StoredListing> = chunk
                .iter()
                .cloned()
                .map(|listing| StoredListing::stamp(listing, created_at, self.retention_days))
                .collect();

            self.store
                .batch_put_listings(&items)
                .await
                .map_err(|source| ScrapeError::BatchWrite {
                    chunk: index + 1,
                    chunks,
                    written,
                    source,
                })?;

            written += items.len();
            tracing::debug!("Persisted chunk {}/{} ({} listings)", index + 1, chunks, items.len());
        }

        Ok(written)
    }
}
