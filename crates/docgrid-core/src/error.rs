//! Error types for DocGrid.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Timeouts, rate limits and other upstream hiccups worth retrying.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Timeouts and upstream failures; these are retried with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Upstream(_) | Error::Timeout(_) | Error::Http(_) | Error::Io(_)
        )
    }

    /// Everything except cancellation and misconfiguration gets another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::Cancelled(_) | Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::Timeout("llm".into()).is_transient());
        assert!(Error::Upstream("429".into()).is_transient());
        assert!(!Error::Cancelled("task_1".into()).is_transient());
        assert!(!Error::Config("no loader".into()).is_transient());
    }

    #[test]
    fn test_retryable() {
        assert!(Error::Internal("bad json".into()).is_retryable());
        assert!(Error::Timeout("llm".into()).is_retryable());
        assert!(!Error::Cancelled("task_1".into()).is_retryable());
        assert!(!Error::Config("missing key".into()).is_retryable());
    }
}
