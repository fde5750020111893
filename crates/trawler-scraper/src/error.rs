use thiserror::Error;
use trawler_browser::BrowserError;
use trawler_db::DatabaseError;

/// Errors raised while scraping a run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Page capability fault
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Storage capability fault
    #[error("storage error: {0}")]
    Storage(#[from] DatabaseError),

    /// An operation kept failing until its attempt budget ran out
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Label of the retried operation
        operation: String,
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        source: Box<ScrapeError>,
    },

    /// A chunk of a bulk write failed; earlier chunks stay persisted
    #[error("batch write failed on chunk {chunk} of {chunks} after {written} records were written: {source}")]
    BatchWrite {
        /// 1-based index of the failed chunk
        chunk: usize,
        /// Total chunks in the write
        chunks: usize,
        /// Records persisted before the failure
        written: usize,
        /// Storage error for the failed chunk
        source: DatabaseError,
    },

    /// The page rendered no listing cards
    #[error("no listing cards rendered at {0}")]
    NoCards(String),

    /// The page returned a value the extractor could not read
    #[error("unexpected page payload: {0}")]
    Payload(String),

    /// The configured search URL is malformed
    #[error("invalid search url: {0}")]
    Url(#[from] url::ParseError),

    /// Browser session could not be acquired
    #[error("browser session failed: {0}")]
    Session(String),

    /// The run was cancelled
    #[error("run cancelled")]
    Cancelled,

    /// A component panicked during the run
    #[error("unexpected fault: {0}")]
    Panicked(String),
}

impl ScrapeError {
    /// Whether another attempt at the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Browser(e) => e.is_transient(),
            Self::NoCards(_) => true,
            _ => false,
        }
    }
}

/// Result type for scraper operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_faults_are_retryable() {
        let timeout = ScrapeError::from(BrowserError::Timeout("cards".to_string()));
        assert!(timeout.is_retryable());
        assert!(ScrapeError::NoCards("https://example.com".to_string()).is_retryable());
    }

    #[test]
    fn test_terminal_faults_are_not_retryable() {
        assert!(!ScrapeError::from(BrowserError::SessionClosed).is_retryable());
        assert!(!ScrapeError::Cancelled.is_retryable());
        assert!(!ScrapeError::Payload("not an object".to_string()).is_retryable());
    }

    #[test]
    fn test_retries_exhausted_message_names_operation() {
        let err = ScrapeError::RetriesExhausted {
            operation: "navigate".to_string(),
            attempts: 3,
            source: Box::new(ScrapeError::from(BrowserError::Timeout(
                "30s elapsed".to_string(),
            ))),
        };
        assert_eq!(
            err.to_string(),
            "navigate failed after 3 attempts: browser error: timeout: 30s elapsed"
        );
    }

    #[test]
    fn test_batch_write_reports_chunk() {
        let err = ScrapeError::BatchWrite {
            chunk: 2,
            chunks: 3,
            written: 25,
            source: DatabaseError::Open("disk full".to_string()),
        };
        assert!(err.to_string().contains("chunk 2 of 3 after 25 records"));
    }
}
