//! Error types for reconciliation.
//!
//! Every failure carries enough context for an operator to act on it: the
//! operation, the HTTP status, the orchestrator's message, and the document
//! that was sent.

use converge_client::{ClientError, StatusCode};
use converge_core::{AppId, DeploymentId};
use serde_json::Value;
use thiserror::Error;

use crate::types::Operation;

/// A result type using `ReconcileError`.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors that can occur while reconciling an application.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The request was rejected before any call was made.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The orchestrator answered with a status the operation does not accept.
    #[error("{operation} {app_id} failed with status {status}: {message}")]
    Transport {
        /// The operation that was attempted.
        operation: Operation,
        /// The application it targeted.
        app_id: AppId,
        /// The status returned by the orchestrator.
        status: StatusCode,
        /// The orchestrator's message, or the status reason.
        message: String,
        /// The decoded response body.
        response: Value,
        /// The document that was sent, if any.
        request: Option<Value>,
    },

    /// No response was received.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// The deployment was still listed when the wait timeout elapsed.
    #[error("timed out after {timeout_secs}s waiting for deployment {deployment_id}")]
    DeploymentTimeout {
        /// The deployment being awaited.
        deployment_id: DeploymentId,
        /// The configured timeout.
        timeout_secs: u64,
    },
}

impl ReconcileError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Transport { .. } | Self::Client(_) => 3,
            Self::DeploymentTimeout { .. } => 4,
        }
    }
}
