//! Reconciliation for converge.
//!
//! This crate turns a [`ReconciliationRequest`] into the smallest sequence of
//! orchestrator calls that reaches the desired state, then optionally waits
//! for the resulting deployment to finish.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CLI (apply)                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Reconciler                           │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  present    │ │  absent     │ │  restarted/killed   │    │
//! │  │  (plan)     │ │             │ │                     │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!               │                              │
//!               ▼                              ▼
//!        ┌──────────────┐             ┌──────────────────┐
//!        │AppRepository │             │DeploymentWaiter  │
//!        └──────┬───────┘             └────────┬─────────┘
//!               └──────────────┬───────────────┘
//!                              ▼
//!                       ┌────────────┐
//!                       │ Transport  │
//!                       └────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use converge_client::ClientConfig;
//! use converge_control::{
//!     DesiredState, Reconcile, Reconciler, ReconcilerConfig, ReconciliationRequest,
//! };
//! use converge_core::AppSpec;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientConfig::new("http://marathon.mesos:8080");
//! let reconciler = Reconciler::connect(&client, &ReconcilerConfig::default())?;
//!
//! let spec = AppSpec::new("/cache")
//!     .with_resources(0.5, 256.0)
//!     .with_instances(1)
//!     .with_docker_image("redis:6");
//! let request = ReconciliationRequest::new(spec, DesiredState::Present).with_wait_timeout(30);
//!
//! let outcome = reconciler.reconcile(&request).await?;
//! println!("changed: {}", outcome.result.changed);
//! # Ok(())
//! # }
//! ```
//!
//! # States
//!
//! - `present`: create if missing, update if idle, destroy and recreate if
//!   held by deployments
//! - `absent`: destroy; a missing app is already converged
//! - `restarted`: always restarts, so always reports a change
//! - `killed`: kill all tasks; no tasks means no change

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod plan;
pub mod reconciler;
pub mod types;
pub mod waiter;

pub use error::{ReconcileError, Result};
pub use plan::PresentPlan;
pub use reconciler::{Reconcile, Reconciler};
pub use types::{
    DeploymentRef, DeploymentSource, DesiredState, Operation, OperationResult, ReconcileOutcome,
    ReconcilerConfig, ReconciliationRequest, StuckDeploymentRecovery,
};
pub use waiter::{Completion, DeploymentWaiter, WaitReport, DEFAULT_POLL_INTERVAL};

// Re-export commonly used types from dependencies for convenience
pub use converge_core::{AppId, AppSpec, DeploymentId};
