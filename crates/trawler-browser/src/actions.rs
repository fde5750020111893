use crate::error::Result;
use std::time::Duration;

/// Page capability driven by the scraper.
///
/// Implementations wrap a real rendering engine; the scraper never assumes
/// anything beyond this surface.
#[async_trait::async_trait]
pub trait PageActions: Send + Sync {
    /// Handle to one element of the current document
    type Element: Send + Sync;

    /// Navigate to a URL, failing if the load does not finish within `timeout`
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until at least one element matches `selector` and return all matches
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<Vec<Self::Element>>;

    /// Return every element currently matching `selector` (possibly none)
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Evaluate a script in the page and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Click an element
    async fn click(&self, element: &Self::Element) -> Result<()>;
}

/// A page capability owning a browser session that must be released.
#[async_trait::async_trait]
pub trait PageSession: PageActions {
    /// Release the session. Called exactly once, at the end of a run.
    async fn close(&mut self) -> Result<()>;
}

/// Acquires a fresh [`PageSession`] for a run.
#[async_trait::async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Session type produced by this launcher
    type Session: PageSession;

    /// Launch the rendering engine and open the page used for the run
    async fn launch(&self) -> Result<Self::Session>;
}
