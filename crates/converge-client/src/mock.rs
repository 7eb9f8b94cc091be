//! In-memory transport for tests.
//!
//! [`MockTransport`] answers requests from per-route scripts and records
//! every call, so tests can assert on the exact request sequence without a
//! network. The last reply queued for a route repeats forever.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::transport::{ApiResponse, Method, StatusCode, Transport};

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API base, including the query string.
    pub path: String,
    /// JSON body, if one was sent.
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
enum Reply {
    Respond(ApiResponse),
    Fail(String),
}

/// Scripted transport.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    /// Create a transport with no scripted routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response for a route.
    ///
    /// # Panics
    ///
    /// Panics if `status` is not a valid HTTP status code.
    pub fn on(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        let status = StatusCode::from_u16(status).expect("valid status code");
        self.push(method, path, Reply::Respond(ApiResponse::new(status, body)))
    }

    /// Queue a response with an empty `{}` body.
    ///
    /// # Panics
    ///
    /// Panics if `status` is not a valid HTTP status code.
    pub fn on_status(&self, method: Method, path: &str, status: u16) -> &Self {
        let status = StatusCode::from_u16(status).expect("valid status code");
        self.push(method, path, Reply::Respond(ApiResponse::empty(status)))
    }

    /// Queue a failure where no response is received.
    pub fn fail(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Reply::Fail(message.to_string()))
    }

    fn push(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// All calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received for an exact route.
    #[must_use]
    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == *method && call.path == path)
            .count()
    }

    /// Number of calls received with the given method.
    #[must_use]
    pub fn count_method(&self, method: &Method) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == *method)
            .count()
    }

    fn next_reply(&self, method: &Method, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(&(method.clone(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        self.calls.lock().push(RecordedCall {
            method: method.clone(),
            path: path.to_string(),
            body: body.cloned(),
        });

        match self.next_reply(&method, path) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(ClientError::Mock(message)),
            None => Err(ClientError::Mock(format!("no response scripted for {method} {path}"))),
        }
    }
}
