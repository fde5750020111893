//! Listing persistence.
//!
//! Listings are written in bulk, one transaction per call, with
//! last-write-wins semantics keyed by the listing identifier.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use trawler_core::config::MAX_BATCH_SIZE;
use trawler_core::ListingRecord;

/// A listing as persisted: the extracted record plus write-time metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredListing {
    /// The extracted record
    pub listing: ListingRecord,
    /// When the row was written
    pub created_at: DateTime<Utc>,
    /// Unix seconds after which the row may be purged
    pub expires_at: i64,
}

impl StoredListing {
    /// Stamp `listing` with `created_at` and an expiry `retention_days` later.
    #[must_use]
    pub fn stamp(listing: ListingRecord, created_at: DateTime<Utc>, retention_days: u32) -> Self {
        let expires_at =
            (created_at + chrono::Duration::days(i64::from(retention_days))).timestamp();
        Self {
            listing,
            created_at,
            expires_at,
        }
    }
}

/// Write up to [`MAX_BATCH_SIZE`] listings in one transaction.
///
/// A listing whose `id` already exists replaces the stored row.
///
/// # Errors
/// Returns `DatabaseError::BatchTooLarge` for oversized batches, or the
/// underlying `SQLx` error. A failed batch leaves no partial writes.
pub async fn batch_put(pool: &Pool<Sqlite>, items: &[StoredListing]) -> Result<()> {
    if items.len() > MAX_BATCH_SIZE {
        return Err(DatabaseError::BatchTooLarge {
            size: items.len(),
            max: MAX_BATCH_SIZE,
        });
    }
    if items.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for item in items {
        let listing = &item.listing;
        sqlx::query(
            "INSERT INTO listings (id, title, company, location, description, salary, job_type, posted_date, url, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                company = excluded.company,
                location = excluded.location,
                description = excluded.description,
                salary = excluded.salary,
                job_type = excluded.job_type,
                posted_date = excluded.posted_date,
                url = excluded.url,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
        )
        .bind(&listing.id)
        .bind(&listing.title)
        .bind(&listing.company)
        .bind(&listing.location)
        .bind(&listing.description)
        .bind(&listing.salary)
        .bind(&listing.job_type)
        .bind(&listing.posted_date)
        .bind(&listing.url)
        .bind(item.created_at.to_rfc3339())
        .bind(item.expires_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::debug!("Wrote batch of {} listings", items.len());
    Ok(())
}

/// Get a stored listing by identifier.
pub async fn get_by_id(pool: &Pool<Sqlite>, id: &str) -> Result<Option<StoredListing>> {
    let row = sqlx::query(
        "SELECT id, title, company, location, description, salary, job_type, posted_date, url, created_at, expires_at
         FROM listings WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| row_to_listing(&r)).transpose()
}

/// Number of stored listings.
pub async fn count(pool: &Pool<Sqlite>) -> Result<i64> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM listings")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

/// Delete listings whose expiry is at or before `now`.
///
/// Returns the number of rows removed.
pub async fn purge_expired(pool: &Pool<Sqlite>, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM listings WHERE expires_at <= ?")
        .bind(now.timestamp())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

fn row_to_listing(row: &SqliteRow) -> Result<StoredListing> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| DatabaseError::Decode(format!("invalid created_at '{created_at}': {e}")))?
        .with_timezone(&Utc);

    Ok(StoredListing {
        listing: ListingRecord {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            company: row.try_get("company")?,
            location: row.try_get("location")?,
            description: row.try_get("description")?,
            salary: row.try_get("salary")?,
            job_type: row.try_get("job_type")?,
            posted_date: row.try_get("posted_date")?,
            url: row.try_get("url")?,
        },
        created_at,
        expires_at: row.try_get("expires_at")?,
    })
}
