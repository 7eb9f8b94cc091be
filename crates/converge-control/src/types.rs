//! Request and result types for reconciliation.
//!
//! These types define the contract between callers and the [`Reconciler`].
//!
//! [`Reconciler`]: crate::Reconciler

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use converge_core::{AppSpec, DeploymentId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::waiter::DEFAULT_POLL_INTERVAL;

/// The outcome a caller wants for an application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// The application exists with the given definition.
    #[default]
    Present,
    /// The application does not exist.
    Absent,
    /// All tasks have been restarted.
    Restarted,
    /// All running tasks have been killed.
    Killed,
}

impl DesiredState {
    /// Returns the lowercase label echoed back to callers.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Restarted => "restarted",
            Self::Killed => "killed",
        }
    }

    /// Fields of the request that must be set for this state.
    #[must_use]
    pub const fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Present | Self::Absent | Self::Restarted | Self::Killed => &["id"],
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DesiredState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "restarted" | "restart" => Ok(Self::Restarted),
            "killed" | "kill" => Ok(Self::Killed),
            other => Err(format!(
                "unknown state {other:?}, expected one of present, absent, restarted, killed"
            )),
        }
    }
}

/// Orchestrator operations, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// `GET /apps/{id}`
    Fetch,
    /// `POST /apps`
    Create,
    /// `PUT /apps/{id}`
    Update,
    /// `DELETE /apps/{id}`
    Destroy,
    /// `POST /apps/{id}/restart`
    Restart,
    /// `DELETE /apps/{id}/tasks`
    KillTasks,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Fetch => "fetch",
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
            Self::Restart => "restart",
            Self::KillTasks => "kill tasks",
        };
        f.write_str(label)
    }
}

/// A normalized reconciliation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    /// Desired application definition.
    pub spec: AppSpec,
    /// Target state.
    #[serde(default)]
    pub desired_state: DesiredState,
    /// Override the orchestrator's guard against changing an app that is
    /// mid-deployment.
    #[serde(default)]
    pub force: bool,
    /// Block until the resulting deployment finishes. Unset or zero means
    /// fire-and-forget.
    #[serde(default)]
    pub wait_timeout_seconds: Option<u64>,
}

impl ReconciliationRequest {
    /// Create a request without force or waiting.
    #[must_use]
    pub fn new(spec: AppSpec, desired_state: DesiredState) -> Self {
        Self {
            spec,
            desired_state,
            force: false,
            wait_timeout_seconds: None,
        }
    }

    /// Set the force flag.
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Wait up to `seconds` for the resulting deployment.
    #[must_use]
    pub fn with_wait_timeout(mut self, seconds: u64) -> Self {
        self.wait_timeout_seconds = Some(seconds);
        self
    }

    /// The wait timeout, or `None` when the caller does not want to wait.
    #[must_use]
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Where a deployment id was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentSource {
    /// Returned by the state-changing request itself.
    Response,
    /// Listed among the application's live deployments.
    LiveDeployments,
}

/// A deployment observed by converge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRef {
    /// Orchestrator deployment id.
    pub id: DeploymentId,
    /// Discovery source.
    pub source: DeploymentSource,
}

impl DeploymentRef {
    /// A deployment returned by a create/update/restart/kill/destroy call.
    #[must_use]
    pub fn from_response(id: DeploymentId) -> Self {
        Self {
            id,
            source: DeploymentSource::Response,
        }
    }

    /// A deployment listed on a fetched application.
    #[must_use]
    pub fn from_live(id: DeploymentId) -> Self {
        Self {
            id,
            source: DeploymentSource::LiveDeployments,
        }
    }
}

/// Record of a destroy-and-recreate performed because the app was
/// mid-deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StuckDeploymentRecovery {
    /// Deployments that held the app when it was fetched.
    pub stuck_deployments: Vec<DeploymentRef>,
}

/// Result of a single reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the orchestrator's state was changed.
    pub changed: bool,
    /// Body returned by the orchestrator for the deciding call.
    pub meta: Value,
    /// Deployment started by the change, if still relevant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentRef>,
    /// Present when the app was destroyed and recreated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery: Option<StuckDeploymentRecovery>,
}

impl OperationResult {
    /// A result where the orchestrator's state changed.
    #[must_use]
    pub fn changed(meta: Value, deployment: Option<DeploymentRef>) -> Self {
        Self {
            changed: true,
            meta,
            deployment,
            recovery: None,
        }
    }

    /// A result where the orchestrator was already converged.
    #[must_use]
    pub fn unchanged(meta: Value) -> Self {
        Self {
            changed: false,
            meta,
            deployment: None,
            recovery: None,
        }
    }

    /// Record a stuck-deployment recovery, also exposing it in `meta`.
    #[must_use]
    pub fn with_recovery(mut self, recovery: StuckDeploymentRecovery) -> Self {
        if let (Value::Object(meta), Ok(value)) = (&mut self.meta, serde_json::to_value(&recovery)) {
            meta.insert("stuckDeploymentRecovery".to_string(), value);
        }
        self.recovery = Some(recovery);
        self
    }
}

/// What the caller gets back on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Orchestrator URI, with trailing slash.
    pub uri: String,
    /// The state that was reconciled.
    pub state: DesiredState,
    /// The operation result.
    #[serde(flatten)]
    pub result: OperationResult,
}

/// Configuration for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// How often the deployments listing is polled while waiting.
    pub poll_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
