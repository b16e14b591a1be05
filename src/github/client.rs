//! Core GitHub transport trait and error type

use async_trait::async_trait;
use serde_json::Value;

/// A GraphQL transport. Each call is one request; callers own retries.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Execute a query and return its `data` object
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, GithubError>;
}

/// Errors that can occur while talking to GitHub
#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing token: environment variable {env_var} not set")]
    MissingToken { env_var: String },
}

impl GithubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GithubError::NotFound(_))
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GithubError::RateLimited { .. })
    }

    /// Whether waiting and asking again could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GithubError::NotFound(_) => false,
            GithubError::MissingToken { .. } => false,
            GithubError::Api { status, .. } => *status >= 500 || *status == 403,
            GithubError::RateLimited { .. } => true,
            GithubError::Graphql(_) => true,
            GithubError::Network(_) => true,
            GithubError::InvalidResponse(_) => true,
            GithubError::Json(_) => true,
        }
    }
}
