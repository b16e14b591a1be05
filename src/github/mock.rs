//! Scripted transport for tests and offline runs

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::github::client::{GithubError, GraphqlTransport};

type Handler = dyn Fn(&str, &Value) -> Result<Value, GithubError> + Send + Sync;

/// Answers every query with a caller-supplied function and records the variables it saw
pub struct MockTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&str, &Value) -> Result<Value, GithubError> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Variables of every call so far, in order
    pub fn calls(&self) -> Vec<Value> {
        self.recorded().into_iter().map(|(_, vars)| vars).collect()
    }

    /// Number of calls whose query text contains `needle`
    pub fn count_matching(&self, needle: &str) -> usize {
        self.recorded().iter().filter(|(query, _)| query.contains(needle)).count()
    }

    fn recorded(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl GraphqlTransport for MockTransport {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, GithubError> {
        let result = (self.handler)(query, &variables);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((query.to_string(), variables));
        result
    }
}
