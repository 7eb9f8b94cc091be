//! Decisions derived from orchestrator responses.
//!
//! Everything here is pure: the reconciler fetches, these functions decide.
//!
//! ```text
//!            fetch /apps/{id}
//!                   │
//!        ┌──────────┼───────────────────┐
//!        │ 404      │ 2xx, deployments  │ 2xx, idle
//!        ▼          ▼                   ▼
//!     Create     Recreate            Update
//!                (destroy, then create)
//! ```

use converge_core::{AppId, DeploymentId};
use serde_json::Value;

use crate::error::{ReconcileError, Result};
use crate::types::{DeploymentRef, ReconciliationRequest};

/// How to converge an application toward `present`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentPlan {
    /// The application does not exist.
    Create,
    /// The application is held by deployments; destroy it and create it again.
    Recreate {
        /// Deployments listed on the fetched application.
        stuck: Vec<DeploymentRef>,
    },
    /// The application exists and is idle.
    Update,
}

/// Choose the `present` strategy from the fetched application.
///
/// `current` is `None` when the fetch returned 404.
#[must_use]
pub fn plan_present(current: Option<&Value>) -> PresentPlan {
    let Some(body) = current else {
        return PresentPlan::Create;
    };

    let stuck = active_deployments(body);
    if stuck.is_empty() {
        PresentPlan::Update
    } else {
        PresentPlan::Recreate {
            stuck: stuck.into_iter().map(DeploymentRef::from_live).collect(),
        }
    }
}

/// Deployments listed on an application document.
///
/// Accepts either the `{"app": {...}}` envelope returned by a fetch or a bare
/// application object.
#[must_use]
pub fn active_deployments(body: &Value) -> Vec<DeploymentId> {
    let app = body.get("app").unwrap_or(body);
    ids_of(app.get("deployments"))
}

/// The deployment started by a state-changing call.
///
/// Prefers `deploymentId`; falls back to the first entry of `deployments`.
#[must_use]
pub fn deployment_ref(body: &Value) -> Option<DeploymentId> {
    if let Some(id) = body.get("deploymentId").and_then(Value::as_str) {
        return Some(DeploymentId::from(id));
    }
    ids_of(body.get("deployments")).into_iter().next()
}

/// Check that the fields `state` needs are set and return the canonical id.
///
/// # Errors
///
/// Returns `ReconcileError::Validation` if the id is missing or malformed.
pub fn validate(request: &ReconciliationRequest) -> Result<AppId> {
    let state = request.desired_state;
    if request.spec.id.trim().is_empty() {
        return Err(ReconcileError::Validation(format!(
            "state {state} requires the following missing parameters: {}",
            state.required_fields().join(", ")
        )));
    }

    AppId::parse(&request.spec.id)
        .map_err(|e| ReconcileError::Validation(format!("invalid id {:?}: {e}", request.spec.id)))
}

fn ids_of(list: Option<&Value>) -> Vec<DeploymentId> {
    list.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("id").and_then(Value::as_str))
                .map(DeploymentId::from)
                .collect()
        })
        .unwrap_or_default()
}
