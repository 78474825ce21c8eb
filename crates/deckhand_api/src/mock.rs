//! Mock gateway for testing.
//!
//! Provides a route table of canned replies plus captured calls, so tests can
//! assert on exactly which upstream requests were issued (or that none were).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::gateway::ApiGateway;
use crate::request::{ApiBody, ApiRequest, ApiToken, Method};

/// Canned reply for one route.
#[derive(Debug, Clone)]
pub enum MockReply {
    Json(Value),
    Empty,
    Status { status: u16, body: String },
    RateLimited(Option<u64>),
}

impl MockReply {
    pub fn json(value: Value) -> Self {
        Self::Json(value)
    }

    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::status(404, "{\"message\":\"not found\"}")
    }

    fn into_result(self) -> ApiResult<ApiBody> {
        match self {
            Self::Json(value) => Ok(ApiBody::Json(value)),
            Self::Empty => Ok(ApiBody::Empty),
            Self::Status { status, body } => Err(ApiError::Rejected { status, body }),
            Self::RateLimited(retry_after) => Err(ApiError::RateLimited { retry_after }),
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub token: String,
}

type RouteKey = (Method, String);

/// Mock gateway.
///
/// Replies registered for the same route are returned in order; the last one
/// repeats. Unregistered routes answer 404.
#[derive(Clone, Default)]
pub struct MockGateway {
    routes: Arc<RwLock<HashMap<RouteKey, Vec<MockReply>>>>,
    cursors: Arc<RwLock<HashMap<RouteKey, usize>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    accepted_token: Arc<RwLock<Option<String>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reply for `method path`.
    pub fn route(self, method: Method, path: impl Into<String>, reply: MockReply) -> Self {
        self.routes
            .write()
            .entry((method, path.into()))
            .or_default()
            .push(reply);
        self
    }

    /// Only this token is accepted; any other gets a 401.
    pub fn accept_only(self, token: impl Into<String>) -> Self {
        *self.accepted_token.write() = Some(token.into());
        self
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    /// Calls matching `method path`.
    pub fn calls_to(&self, method: Method, path: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .cloned()
            .collect()
    }

    pub fn was_called(&self, method: Method, path: &str) -> bool {
        !self.calls_to(method, path).is_empty()
    }

    fn next_reply(&self, key: &RouteKey) -> MockReply {
        let routes = self.routes.read();
        let Some(replies) = routes.get(key).filter(|r| !r.is_empty()) else {
            return MockReply::not_found();
        };
        let mut cursors = self.cursors.write();
        let cursor = cursors.entry(key.clone()).or_insert(0);
        let reply = replies[(*cursor).min(replies.len() - 1)].clone();
        *cursor += 1;
        reply
    }
}

#[async_trait]
impl ApiGateway for MockGateway {
    async fn call(&self, token: &ApiToken, request: ApiRequest) -> ApiResult<ApiBody> {
        self.captured_calls.write().push(CapturedCall {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            token: token.expose().to_string(),
        });

        if let Some(accepted) = self.accepted_token.read().as_deref() {
            if accepted != token.expose() {
                return Err(ApiError::Rejected {
                    status: 401,
                    body: "{\"message\":\"unauthorized\"}".to_string(),
                });
            }
        }

        self.next_reply(&(request.method, request.path))
            .into_result()
    }
}
