//! Reading one listing out of the rendered detail view.
//!
//! Each field is looked up through a priority-ordered list of selectors and
//! takes the first non-empty text. A candidate without an identifier, title
//! or company is rejected, which is not an error.

use crate::error::{Result, ScrapeError};
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::time::Duration;
use trawler_browser::PageActions;
use trawler_core::{ListingRecord, SelectorConfig};

/// Attribute carrying the source-assigned listing identifier.
const ID_ATTRIBUTE: &str = "data-job-id";

/// Field values as read from the page, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawListing {
    /// Identifier attribute, or the last URL path segment
    pub id: Option<String>,
    /// Listing title
    pub title: Option<String>,
    /// Hiring organization
    pub company: Option<String>,
    /// Location text
    pub location: Option<String>,
    /// Description text
    pub description: Option<String>,
    /// Salary range, when shown
    pub salary: Option<String>,
    /// Employment type, when shown
    pub job_type: Option<String>,
    /// Posted date as displayed
    pub posted_date: Option<String>,
    /// Address of the page the listing was read from
    pub url: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RawListing {
    /// Validate into a [`ListingRecord`], or `None` when a required field is missing.
    pub fn into_listing(self) -> Option<ListingRecord> {
        let id = clean(self.id)?;
        let title = clean(self.title)?;
        let company = clean(self.company)?;

        Some(ListingRecord {
            id,
            title,
            company,
            location: clean(self.location).unwrap_or_default(),
            description: clean(self.description).unwrap_or_default(),
            salary: clean(self.salary),
            job_type: clean(self.job_type),
            posted_date: clean(self.posted_date).unwrap_or_default(),
            url: clean(self.url).unwrap_or_default(),
        })
    }
}

/// Build the in-page lookup script for a selector table.
pub fn lookup_script(selectors: &SelectorConfig) -> String {
    let list = |s: &[String]| serde_json::to_string(s).unwrap_or_else(|_| "[]".to_string());

    format!(
        r"(() => {{
    const text = (selectors) => {{
        for (const selector of selectors) {{
            const el = document.querySelector(selector);
            const value = el && el.textContent ? el.textContent.trim() : '';
            if (value) return value;
        }}
        return null;
    }};
    const attribute = (selectors, name) => {{
        for (const selector of selectors) {{
            const el = document.querySelector(selector);
            const value = el ? el.getAttribute(name) : null;
            if (value) return value;
        }}
        return null;
    }};
    const lastSegment = () => {{
        const parts = window.location.pathname.split('/').filter(Boolean);
        return parts.length ? parts[parts.length - 1] : null;
    }};
    return {{
        id: attribute({ids}, '{attr}') || lastSegment(),
        title: text({title}),
        company: text({company}),
        location: text({location}),
        description: text({description}),
        salary: text({salary}),
        jobType: text({job_type}),
        postedDate: text({posted_date}),
        url: window.location.href,
    }};
}})()",
        ids = list(&selectors.id_sources),
        attr = ID_ATTRIBUTE,
        title = list(&selectors.title),
        company = list(&selectors.company),
        location = list(&selectors.location),
        description = list(&selectors.description),
        salary = list(&selectors.salary),
        job_type = list(&selectors.job_type),
        posted_date = list(&selectors.posted_date),
    )
}

/// Opens a card and reads the listing it shows.
#[derive(Debug, Clone)]
pub struct Extractor {
    detail_view: String,
    detail_timeout: Duration,
    detail_retry: RetryPolicy,
    script: String,
}

impl Extractor {
    /// Create an extractor for a selector table.
    ///
    /// `detail_retry` bounds the whole open, wait and read step of one card.
    pub fn new(selectors: &SelectorConfig, detail_timeout: Duration, detail_retry: RetryPolicy) -> Self {
        Self {
            detail_view: selectors.detail_view.clone(),
            detail_timeout,
            detail_retry,
            script: lookup_script(selectors),
        }
    }

    /// Open `card` and extract its listing.
    ///
    /// Returns `Ok(None)` when the candidate fails validation; rejects are
    /// never retried.
    ///
    /// # Errors
    /// Returns an error when the detail view never renders or the page
    /// cannot be read.
    pub async fn extract<P: PageActions>(
        &self,
        page: &P,
        card: &P::Element,
    ) -> Result<Option<ListingRecord>> {
        let raw = self
            .detail_retry
            .execute("read listing detail", || async move {
                page.click(card).await?;
                page.wait_for_selector(&self.detail_view, self.detail_timeout)
                    .await?;
                let value = page.evaluate(&self.script).await?;
                serde_json::from_value::<RawListing>(value)
                    .map_err(|e| ScrapeError::Payload(e.to_string()))
            })
            .await?;

        let candidate_id = raw.id.clone();
        match raw.into_listing() {
            Some(listing) => {
                tracing::debug!(id = %listing.id, "Extracted {} at {}", listing.title, listing.company);
                Ok(Some(listing))
            }
            None => {
                tracing::debug!(id = ?candidate_id, "Skipping listing with missing required fields");
                Ok(None)
            }
        }
    }
}
