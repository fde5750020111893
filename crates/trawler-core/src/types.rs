//! Shared types used across Trawler.
//!
//! This module defines the domain records that flow from extraction to
//! storage, plus the identifiers used for run accounting.

use crate::error::TrawlerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One structured listing pulled from a rendered detail view.
///
/// The `id` is assigned by the source and is the idempotency key used by
/// storage: writing a record with an existing `id` replaces the old row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    /// Source-assigned identifier
    pub id: String,
    /// Listing title
    pub title: String,
    /// Hiring organization name
    pub company: String,
    /// Location string as displayed by the source
    pub location: String,
    /// Description text
    pub description: String,
    /// Salary range, when the source shows one
    pub salary: Option<String>,
    /// Employment type tag (full-time, contract, ...)
    pub job_type: Option<String>,
    /// Posted date as displayed by the source
    pub posted_date: String,
    /// URL of the detail view the record was read from
    pub url: String,
}

/// A (query, location) pair driving one pagination loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchCombination {
    /// Search keywords
    pub query: String,
    /// Location filter
    pub location: String,
}

impl SearchCombination {
    /// Create a new combination.
    pub fn new(query: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
        }
    }

    /// Keywords sent to the source: the query followed by the location.
    #[must_use]
    pub fn keywords(&self) -> String {
        format!("{} {}", self.query, self.location)
            .trim()
            .to_string()
    }
}

impl fmt::Display for SearchCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' in '{}'", self.query, self.location)
    }
}

/// Identifier of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Create a `RunId` from an existing identifier.
    ///
    /// # Errors
    /// Returns error if the identifier is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, TrawlerError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TrawlerError::Validation(
                "invalid run ID: must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Create a new random `RunId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
