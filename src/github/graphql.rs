//! GitHub GraphQL API client
//!
//! Implements `GraphqlTransport` over HTTPS with a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::GithubConfig;
use crate::github::client::{GithubError, GraphqlTransport};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// GitHub GraphQL client
pub struct GithubClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl GithubClient {
    /// Create a new client, reading the token from the configured env var
    pub fn new(config: &GithubConfig) -> Result<Self, GithubError> {
        let token = std::env::var(&config.token_env).map_err(|_| GithubError::MissingToken {
            env_var: config.token_env.clone(),
        })?;

        Self::with_token(token, config)
    }

    /// Create a client with an explicit token
    pub fn with_token(token: String, config: &GithubConfig) -> Result<Self, GithubError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token,
        })
    }
}

#[async_trait]
impl GraphqlTransport for GithubClient {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, GithubError> {
        let body = json!({ "query": query, "variables": variables });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        // Handle rate limiting
        if status.as_u16() == 429 || (status.as_u16() == 403 && response.headers().contains_key("retry-after")) {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(GithubError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GithubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response.json().await?;
        parse_graphql_response(payload)
    }
}

/// Split a GraphQL response envelope into its `data` or a typed error.
///
/// GitHub reports a missing user or organization as an error of type
/// `NOT_FOUND` alongside a null field in `data`.
pub fn parse_graphql_response(payload: Value) -> Result<Value, GithubError> {
    let errors = payload.get("errors").and_then(Value::as_array).filter(|e| !e.is_empty());
    if let Some(errors) = errors {
        let error_type = |e: &Value| e.get("type").and_then(Value::as_str).map(str::to_string);
        let message = |e: &Value| {
            e.get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string()
        };

        if let Some(err) = errors.iter().find(|e| error_type(e).as_deref() == Some("NOT_FOUND")) {
            return Err(GithubError::NotFound(message(err)));
        }
        if errors.iter().any(|e| error_type(e).as_deref() == Some("RATE_LIMITED")) {
            return Err(GithubError::RateLimited { retry_after_secs: 60 });
        }

        let joined = errors.iter().map(message).collect::<Vec<_>>().join("; ");
        return Err(GithubError::Graphql(joined));
    }

    match payload.get("data") {
        Some(Value::Null) | None => Err(GithubError::InvalidResponse("response has no data".to_string())),
        Some(data) => Ok(data.clone()),
    }
}
