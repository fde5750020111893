use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("script evaluation failed: {0}")]
    EvaluationError(String),

    #[error("element interaction failed: {0}")]
    ElementError(String),

    #[error("session closed")]
    SessionClosed,
}

impl BrowserError {
    /// Whether the fault is a transport/rendering hiccup worth retrying.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::SessionClosed)
    }
}
