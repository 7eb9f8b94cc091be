//! HTTP transport for the orchestrator REST API.
//!
//! This module provides the [`Transport`] seam used by the repository and the
//! deployment waiter, and [`HttpTransport`], its reqwest implementation.
//! A transport never turns a non-2xx status into an error; it hands the
//! status and decoded body back so the reconciler can decide what it means.

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Map, Value};

pub use reqwest::{Method, StatusCode};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Maximum number of bytes of a non-JSON error body kept in the message.
const MAX_RAW_MESSAGE_BYTES: usize = 512;

/// Trait for orchestrator communication.
///
/// This trait abstracts the transport, allowing the reconciler to be driven
/// by a scripted implementation in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a request against a path relative to the API base (e.g. `/apps`).
    ///
    /// # Errors
    ///
    /// Returns an error only if no response was received or a successful
    /// response could not be decoded. Non-2xx statuses are returned as
    /// [`ApiResponse`]s.
    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse>;
}

/// Status and decoded body of an orchestrator response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Decoded JSON body, `{}` when the body was empty or not JSON.
    pub body: Value,
    /// Orchestrator-provided message, or the status reason phrase.
    pub message: String,
}

impl ApiResponse {
    /// Build a response, deriving the message from the body or status.
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| reason(status), ToString::to_string);
        Self {
            status,
            body,
            message,
        }
    }

    /// A response with an empty `{}` body.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Value::Object(Map::new()))
    }

    /// Whether the orchestrator accepted the request.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the addressed resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}

fn reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), ToString::to_string)
}

/// HTTP transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport from the connection configuration.
    ///
    /// Basic auth, JSON content negotiation and the TLS policy are baked
    /// into the underlying client once.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be encoded as a header or
    /// the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(creds) = config.credentials() {
            let token = BASE64_STANDARD.encode(format!("{}:{}", creds.username, creds.password));
            let mut value = HeaderValue::from_str(&format!("Basic {token}"))
                .map_err(|e| ClientError::Config(format!("invalid credentials: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        if !config.validate_certs {
            tracing::warn!(uri = %config.uri, "TLS certificate validation disabled");
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .danger_accept_invalid_certs(!config.validate_certs)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, config.api_base()))
    }

    /// Create a transport with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Get the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| ClientError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| ClientError::Request {
            url: url.clone(),
            source,
        })?;

        tracing::debug!(method = %method, url = %url, status = %status, "Orchestrator call");

        if text.trim().is_empty() {
            return Ok(ApiResponse::empty(status));
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(ApiResponse::new(status, body)),
            Err(source) if status.is_success() => Err(ClientError::Decode { url, source }),
            Err(_) => {
                // Proxies in front of the orchestrator answer with HTML or plain text.
                let mut response = ApiResponse::empty(status);
                response.message = format!("{}: {}", reason(status), truncate(text.trim()));
                Ok(response)
            }
        }
    }
}

fn truncate(text: &str) -> &str {
    if text.len() <= MAX_RAW_MESSAGE_BYTES {
        return text;
    }
    let mut end = MAX_RAW_MESSAGE_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
