//! Error types for ghledger
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::github::GithubError;

/// All error types that can occur while building or ranking ledgers
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The queried user or organization no longer exists on GitHub
    #[error("Not found upstream: {0}")]
    NotFoundUpstream(String),

    /// Any other GitHub failure (rate limit, network, malformed response)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Storage/persistence error
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid or inconsistent configuration
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFoundUpstream(_))
    }
}

impl From<GithubError> for LedgerError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::NotFound(what) => LedgerError::NotFoundUpstream(what),
            other => LedgerError::Upstream(other.to_string()),
        }
    }
}

/// Result type alias for ghledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_upstream_error() {
        let err = LedgerError::NotFoundUpstream("alice".to_string());
        assert_eq!(err.to_string(), "Not found upstream: alice");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_store_error() {
        let err = LedgerError::Store("file locked".to_string());
        assert_eq!(err.to_string(), "Store error: file locked");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_github_not_found_maps_to_not_found_upstream() {
        let err: LedgerError = GithubError::NotFound("user alice".to_string()).into();
        assert!(matches!(err, LedgerError::NotFoundUpstream(ref s) if s == "user alice"));
    }

    #[test]
    fn test_github_rate_limit_maps_to_upstream() {
        let err: LedgerError = GithubError::RateLimited { retry_after_secs: 60 }.into();
        assert!(matches!(err, LedgerError::Upstream(_)));
        assert!(err.to_string().contains("60"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LedgerError = io_err.into();
        assert!(matches!(err, LedgerError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: LedgerError = json_err.into();
        assert!(matches!(err, LedgerError::Json(_)));
    }
}
