//! Run records for per-invocation accounting.
//!
//! A run row is inserted "open" (no end time, no success flag) and later
//! moves to exactly one terminal state.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use trawler_core::RunId;

/// Represents one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier for the run
    pub id: String,
    /// When the run started
    pub start_time: DateTime<Utc>,
    /// When the run finished (absent while open)
    pub end_time: Option<DateTime<Utc>>,
    /// Terminal outcome (absent while open)
    pub success: Option<bool>,
    /// Listings found so far
    pub listings_found: u32,
    /// Error message if the run failed
    pub error: Option<String>,
    /// When the row was created
    pub created_at: DateTime<Utc>,
}

impl RunRecord {
    /// A new open record starting now.
    #[must_use]
    pub fn open(id: &RunId, start_time: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            start_time,
            end_time: None,
            success: None,
            listings_found: 0,
            error: None,
            created_at: start_time,
        }
    }

    /// Whether the run has not reached a terminal state yet.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Terminal fields written when a run finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// When the run finished
    pub end_time: DateTime<Utc>,
    /// Whether the run succeeded
    pub success: bool,
    /// Listings found by the run
    pub listings_found: u32,
    /// Error description for failed runs
    pub error: Option<String>,
}

/// Insert an open run record.
///
/// # Errors
/// Returns `sqlx::Error` (wrapped) if the insert fails, including when the id already exists.
pub async fn create_run(pool: &Pool<Sqlite>, run: &RunRecord) -> Result<()> {
    sqlx::query(
        "INSERT INTO runs (id, start_time, end_time, success, listings_found, error, created_at)
         VALUES (?, ?, NULL, NULL, ?, NULL, ?)",
    )
    .bind(&run.id)
    .bind(run.start_time.to_rfc3339())
    .bind(i64::from(run.listings_found))
    .bind(run.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Write the terminal fields of an open run.
///
/// # Errors
/// Returns `DatabaseError::AlreadyFinalized` if the run is no longer open,
/// or `DatabaseError::NotFoundWithMessage` if it does not exist.
pub async fn finalize_run(pool: &Pool<Sqlite>, id: &str, outcome: &RunOutcome) -> Result<()> {
    let result = sqlx::query(
        "UPDATE runs SET end_time = ?, success = ?, listings_found = ?, error = ?
         WHERE id = ? AND end_time IS NULL",
    )
    .bind(outcome.end_time.to_rfc3339())
    .bind(outcome.success)
    .bind(i64::from(outcome.listings_found))
    .bind(&outcome.error)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match get_run(pool, id).await? {
            Some(_) => Err(DatabaseError::AlreadyFinalized(id.to_string())),
            None => Err(DatabaseError::NotFoundWithMessage(format!(
                "Run '{id}' not found"
            ))),
        };
    }

    Ok(())
}

/// Get a run by ID.
pub async fn get_run(pool: &Pool<Sqlite>, id: &str) -> Result<Option<RunRecord>> {
    let row = sqlx::query(
        "SELECT id, start_time, end_time, success, listings_found, error, created_at FROM runs WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| row_to_run(&r)).transpose()
}

/// Most recent runs first.
pub async fn list_recent(pool: &Pool<Sqlite>, limit: u32) -> Result<Vec<RunRecord>> {
    let rows = sqlx::query(
        "SELECT id, start_time, end_time, success, listings_found, error, created_at
         FROM runs ORDER BY start_time DESC LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_run).collect()
}

fn parse_time(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("invalid {column} '{value}': {e}")))
}

fn row_to_run(row: &SqliteRow) -> Result<RunRecord> {
    let start_time: String = row.try_get("start_time")?;
    let end_time: Option<String> = row.try_get("end_time")?;
    let created_at: String = row.try_get("created_at")?;
    let listings_found: i64 = row.try_get("listings_found")?;

    Ok(RunRecord {
        id: row.try_get("id")?,
        start_time: parse_time("start_time", &start_time)?,
        end_time: end_time
            .as_deref()
            .map(|t| parse_time("end_time", t))
            .transpose()?,
        success: row.try_get("success")?,
        listings_found: u32::try_from(listings_found)
            .map_err(|_| DatabaseError::Decode(format!("invalid listings_found {listings_found}")))?,
        error: row.try_get("error")?,
        created_at: parse_time("created_at", &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_test_db() -> Database {
        let db = Database::new(":memory:").await.expect("create test database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    fn outcome(success: bool, found: u32, error: Option<&str>) -> RunOutcome {
        RunOutcome {
            end_time: Utc::now(),
            success,
            listings_found: found,
            error: error.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_open_run() {
        let db = setup_test_db().await;
        let run = RunRecord::open(&RunId::generate(), Utc::now());

        create_run(db.pool(), &run).await.expect("create run");

        let stored = get_run(db.pool(), &run.id)
            .await
            .expect("query run")
            .expect("run exists");
        assert!(stored.is_open());
        assert_eq!(stored.success, None);
        assert_eq!(stored.listings_found, 0);
    }

    #[tokio::test]
    async fn test_finalize_success() {
        let db = setup_test_db().await;
        let run = RunRecord::open(&RunId::generate(), Utc::now());
        create_run(db.pool(), &run).await.expect("create run");

        finalize_run(db.pool(), &run.id, &outcome(true, 42, None))
            .await
            .expect("finalize run");

        let stored = get_run(db.pool(), &run.id)
            .await
            .expect("query run")
            .expect("run exists");
        assert!(!stored.is_open());
        assert_eq!(stored.success, Some(true));
        assert_eq!(stored.listings_found, 42);
        assert_eq!(stored.error, None);
    }

    #[tokio::test]
    async fn test_finalize_only_once() {
        let db = setup_test_db().await;
        let run = RunRecord::open(&RunId::generate(), Utc::now());
        create_run(db.pool(), &run).await.expect("create run");

        finalize_run(db.pool(), &run.id, &outcome(false, 3, Some("browser crashed")))
            .await
            .expect("first finalize");

        let second = finalize_run(db.pool(), &run.id, &outcome(true, 10, None)).await;
        assert!(matches!(second, Err(DatabaseError::AlreadyFinalized(_))));

        let stored = get_run(db.pool(), &run.id)
            .await
            .expect("query run")
            .expect("run exists");
        assert_eq!(stored.success, Some(false));
        assert_eq!(stored.error.as_deref(), Some("browser crashed"));
    }

    #[tokio::test]
    async fn test_finalize_missing_run() {
        let db = setup_test_db().await;
        let result = finalize_run(db.pool(), "no-such-run", &outcome(true, 0, None)).await;
        match result {
            Err(DatabaseError::NotFoundWithMessage(msg)) => {
                assert!(msg.contains("Run 'no-such-run' not found"));
            }
            other => panic!("Expected NotFoundWithMessage error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_recent_orders_newest_first() {
        let db = setup_test_db().await;
        let earlier = Utc::now() - chrono::Duration::hours(2);
        let later = Utc::now();

        let old_run = RunRecord::open(&RunId::generate(), earlier);
        let new_run = RunRecord::open(&RunId::generate(), later);
        create_run(db.pool(), &old_run).await.expect("create old run");
        create_run(db.pool(), &new_run).await.expect("create new run");

        let runs = list_recent(db.pool(), 10).await.expect("list runs");
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, new_run.id);

        let limited = list_recent(db.pool(), 1).await.expect("list runs");
        assert_eq!(limited.len(), 1);
    }
}
