//! Client error types.
//!
//! A non-2xx response is *not* an error at this layer: it is returned as an
//! [`ApiResponse`](crate::ApiResponse) and interpreted by the caller. These
//! errors cover requests that never produced a usable response.

use thiserror::Error;

/// A result type using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the orchestrator.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the connection failed.
    #[error("request to {url} failed: {source}")]
    Request {
        /// The URL being requested.
        url: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// A successful response carried a body that is not valid JSON.
    #[error("invalid JSON in response from {url}: {source}")]
    Decode {
        /// The URL being requested.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The application document could not be rendered.
    #[error("invalid application document: {0}")]
    Document(#[from] converge_core::CoreError),

    /// The client could not be built from the configuration.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// Failure reported by the in-memory test transport.
    #[error("mock transport: {0}")]
    Mock(String),
}
