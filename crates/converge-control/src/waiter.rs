//! Deployment waiter.
//!
//! Polls `GET /deployments` until a deployment id is no longer listed or the
//! deadline passes. A failed poll never ends the wait early; only the
//! deadline does.

use std::sync::Arc;
use std::time::Duration;

use converge_client::{Method, Transport};
use converge_core::DeploymentId;
use serde_json::Value;
use tokio::time::{sleep_until, Instant};

use crate::error::{ReconcileError, Result};

/// Interval between polls of the deployments listing.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const DEPLOYMENTS_PATH: &str = "/deployments";

/// Deadline used when the requested timeout does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Why a wait ended successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The deployment dropped out of the listing.
    Finished,
    /// The orchestrator reported no deployments resource at all.
    NoDeployments,
}

/// Summary of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitReport {
    /// How the wait ended.
    pub completion: Completion,
    /// Number of polls issued, including the last one.
    pub polls: u32,
    /// Time spent waiting.
    pub elapsed: Duration,
}

enum Poll {
    Done(Completion),
    Pending,
}

/// Blocks until a deployment leaves the orchestrator's in-flight list.
#[derive(Debug)]
pub struct DeploymentWaiter<T> {
    transport: Arc<T>,
    poll_interval: Duration,
}

impl<T> Clone for DeploymentWaiter<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            poll_interval: self.poll_interval,
        }
    }
}

impl<T: Transport> DeploymentWaiter<T> {
    /// Create a waiter polling at [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_poll_interval(transport, DEFAULT_POLL_INTERVAL)
    }

    /// Create a waiter with a custom poll interval.
    #[must_use]
    pub fn with_poll_interval(transport: Arc<T>, poll_interval: Duration) -> Self {
        Self {
            transport,
            poll_interval,
        }
    }

    /// The configured poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait for `deployment` to finish.
    ///
    /// The listing is polled immediately, then once per interval. The last
    /// sleep is shortened so that a poll happens at the deadline.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::DeploymentTimeout` if the deployment is still
    /// listed, or could not be checked, when `timeout` elapses.
    pub async fn wait(&self, deployment: &DeploymentId, timeout: Duration) -> Result<WaitReport> {
        let started = Instant::now();
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let mut polls = 0u32;

        tracing::debug!(
            deployment_id = %deployment,
            timeout_secs = timeout.as_secs(),
            "Waiting for deployment"
        );

        loop {
            polls += 1;
            if let Poll::Done(completion) = self.poll(deployment).await {
                let elapsed = started.elapsed();
                tracing::info!(
                    deployment_id = %deployment,
                    polls,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Deployment finished"
                );
                return Ok(WaitReport {
                    completion,
                    polls,
                    elapsed,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(deployment_id = %deployment, polls, "Timed out waiting for deployment");
                return Err(ReconcileError::DeploymentTimeout {
                    deployment_id: deployment.clone(),
                    timeout_secs: timeout.as_secs(),
                });
            }

            sleep_until((now + self.poll_interval).min(deadline)).await;
        }
    }

    async fn poll(&self, deployment: &DeploymentId) -> Poll {
        match self.transport.call(Method::GET, DEPLOYMENTS_PATH, None).await {
            Ok(response) if response.is_not_found() => Poll::Done(Completion::NoDeployments),
            Ok(response) if response.is_success() => match is_listed(&response.body, deployment) {
                Some(true) => Poll::Pending,
                Some(false) => Poll::Done(Completion::Finished),
                None => {
                    tracing::warn!(deployment_id = %deployment, "Deployments listing is not an array");
                    Poll::Pending
                }
            },
            Ok(response) => {
                tracing::warn!(
                    deployment_id = %deployment,
                    status = %response.status,
                    message = %response.message,
                    "Deployments poll rejected"
                );
                Poll::Pending
            }
            Err(e) => {
                tracing::warn!(deployment_id = %deployment, error = %e, "Deployments poll failed");
                Poll::Pending
            }
        }
    }
}

/// `None` when the listing has an unexpected shape.
fn is_listed(listing: &Value, deployment: &DeploymentId) -> Option<bool> {
    let items = listing.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.get("id").and_then(Value::as_str))
            .any(|id| id == deployment.as_str()),
    )
}
