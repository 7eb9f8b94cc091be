//! Common error types for converge.
//!
//! This module provides the errors raised while validating and rendering
//! application documents.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors shared by the client and control crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),

    /// The application document could not be rendered to JSON.
    #[error("failed to render application document: {0}")]
    Document(#[from] serde_json::Error),

    /// The rendered document was not a JSON object.
    #[error("application document must be a JSON object")]
    NotAnObject,
}
