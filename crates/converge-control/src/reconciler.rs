//! Reconciler implementation.
//!
//! This module provides the `Reconcile` trait and the `Reconciler` that
//! drives an application toward its desired state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use converge_client::{ApiResponse, AppRepository, ClientConfig, HttpTransport, Transport};
use converge_core::{AppId, DeploymentId};
use serde_json::Value;

use crate::error::{ReconcileError, Result};
use crate::plan::{self, PresentPlan};
use crate::types::{
    DeploymentRef, DesiredState, Operation, OperationResult, ReconcileOutcome,
    ReconcilerConfig, ReconciliationRequest, StuckDeploymentRecovery,
};
use crate::waiter::DeploymentWaiter;

/// Drives an application toward a desired state.
#[async_trait]
pub trait Reconcile: Send + Sync {
    /// Converge one application.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Validation` before any call if the request
    /// is malformed, `ReconcileError::Transport` if the orchestrator rejects
    /// a call, and `ReconcileError::DeploymentTimeout` if a wait expires.
    async fn reconcile(&self, request: &ReconciliationRequest) -> Result<ReconcileOutcome>;
}

/// The reconciler over a transport.
pub struct Reconciler<T: Transport> {
    apps: AppRepository<T>,
    waiter: DeploymentWaiter<T>,
    uri: String,
}

impl Reconciler<HttpTransport> {
    /// Build a reconciler talking HTTP to the configured orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(client: &ClientConfig, config: &ReconcilerConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(client)?);
        Ok(Self::new(transport, client.normalized_uri(), config))
    }
}

impl<T: Transport> Reconciler<T> {
    /// Create a reconciler. `uri` is echoed back in every outcome.
    #[must_use]
    pub fn new(transport: Arc<T>, uri: impl Into<String>, config: &ReconcilerConfig) -> Self {
        Self {
            apps: AppRepository::new(Arc::clone(&transport)),
            waiter: DeploymentWaiter::with_poll_interval(transport, config.poll_interval),
            uri: uri.into(),
        }
    }

    /// Get the application repository.
    #[must_use]
    pub const fn apps(&self) -> &AppRepository<T> {
        &self.apps
    }

    /// Get the orchestrator URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    async fn present(
        &self,
        id: &AppId,
        request: &ReconciliationRequest,
        wait: Option<Duration>,
    ) -> Result<OperationResult> {
        let document = self
            .apps
            .render(&request.spec)
            .map_err(|e| ReconcileError::Validation(e.to_string()))?;

        let fetched = self.apps.fetch(id).await?;
        let current = if fetched.is_not_found() {
            None
        } else if fetched.is_success() {
            Some(&fetched.body)
        } else {
            return Err(rejected(Operation::Fetch, id, fetched, None));
        };

        match plan::plan_present(current) {
            PresentPlan::Create => self.create(id, &document, wait).await,
            PresentPlan::Update => self.update(id, &document, request.force, wait).await,
            PresentPlan::Recreate { stuck } => {
                tracing::warn!(
                    app_id = %id,
                    stuck = ?stuck.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
                    "App is held by deployments, destroying and recreating"
                );
                self.destroy(id, true, wait).await?;
                let result = self.create(id, &document, wait).await?;
                Ok(result.with_recovery(StuckDeploymentRecovery {
                    stuck_deployments: stuck,
                }))
            }
        }
    }

    async fn create(
        &self,
        id: &AppId,
        document: &Value,
        wait: Option<Duration>,
    ) -> Result<OperationResult> {
        let response = accept(
            Operation::Create,
            id,
            self.apps.create(document).await?,
            Some(document),
        )?;
        tracing::info!(app_id = %id, "App created");

        let deployment = plan::deployment_ref(&response.body);
        self.await_deployment(id, deployment.as_ref(), wait).await?;
        Ok(OperationResult::changed(
            response.body,
            deployment.map(DeploymentRef::from_response),
        ))
    }

    async fn update(
        &self,
        id: &AppId,
        document: &Value,
        force: bool,
        wait: Option<Duration>,
    ) -> Result<OperationResult> {
        let response = accept(
            Operation::Update,
            id,
            self.apps.update(id, document, force).await?,
            Some(document),
        )?;

        // Only a definition change starts a deployment.
        let Some(deployment) = plan::deployment_ref(&response.body) else {
            tracing::debug!(app_id = %id, "App already up to date");
            return Ok(OperationResult::unchanged(response.body));
        };

        tracing::info!(app_id = %id, deployment_id = %deployment, "App updated");
        self.await_deployment(id, Some(&deployment), wait).await?;
        Ok(OperationResult::changed(
            response.body,
            Some(DeploymentRef::from_response(deployment)),
        ))
    }

    async fn destroy(&self, id: &AppId, force: bool, wait: Option<Duration>) -> Result<OperationResult> {
        let response = self.apps.destroy(id, force).await?;
        if response.is_not_found() {
            tracing::debug!(app_id = %id, "App already absent");
            return Ok(OperationResult::unchanged(response.body));
        }
        let response = accept(Operation::Destroy, id, response, None)?;

        let Some(deployment) = plan::deployment_ref(&response.body) else {
            return Ok(OperationResult::unchanged(response.body));
        };

        tracing::info!(app_id = %id, deployment_id = %deployment, "App destroyed");
        self.await_deployment(id, Some(&deployment), wait).await?;
        // A finished removal leaves nothing to track.
        let deployment = wait.is_none().then(|| DeploymentRef::from_response(deployment));
        Ok(OperationResult::changed(response.body, deployment))
    }

    async fn restart(&self, id: &AppId, force: bool, wait: Option<Duration>) -> Result<OperationResult> {
        let response = accept(
            Operation::Restart,
            id,
            self.apps.restart(id, force).await?,
            None,
        )?;

        let deployment = plan::deployment_ref(&response.body);
        tracing::info!(
            app_id = %id,
            deployment_id = ?deployment.as_ref().map(DeploymentId::as_str),
            "App restarted"
        );
        self.await_deployment(id, deployment.as_ref(), wait).await?;
        Ok(OperationResult::changed(
            response.body,
            deployment.map(DeploymentRef::from_response),
        ))
    }

    async fn kill(&self, id: &AppId, wait: Option<Duration>) -> Result<OperationResult> {
        let response = self.apps.kill_tasks(id).await?;
        if response.is_not_found() {
            tracing::debug!(app_id = %id, "App not found, no tasks to kill");
            return Ok(OperationResult::unchanged(response.body));
        }
        let response = accept(Operation::KillTasks, id, response, None)?;

        let Some(deployment) = plan::deployment_ref(&response.body) else {
            tracing::debug!(app_id = %id, "No tasks were running");
            return Ok(OperationResult::unchanged(response.body));
        };

        tracing::info!(app_id = %id, deployment_id = %deployment, "App tasks killed");
        self.await_deployment(id, Some(&deployment), wait).await?;
        Ok(OperationResult::changed(
            response.body,
            Some(DeploymentRef::from_response(deployment)),
        ))
    }

    async fn await_deployment(
        &self,
        id: &AppId,
        deployment: Option<&DeploymentId>,
        wait: Option<Duration>,
    ) -> Result<()> {
        let Some(timeout) = wait else {
            return Ok(());
        };
        match deployment {
            Some(deployment) => {
                self.waiter.wait(deployment, timeout).await?;
            }
            None => {
                tracing::warn!(app_id = %id, "No deployment id in response, not waiting");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Transport + 'static> Reconcile for Reconciler<T> {
    async fn reconcile(&self, request: &ReconciliationRequest) -> Result<ReconcileOutcome> {
        let id = plan::validate(request)?;
        let state = request.desired_state;
        let wait = request.wait_timeout();

        tracing::info!(
            app_id = %id,
            state = %state,
            force = request.force,
            wait_timeout_secs = wait.map(|t| t.as_secs()),
            "Reconciling app"
        );

        let result = match state {
            DesiredState::Present => self.present(&id, request, wait).await?,
            DesiredState::Absent => self.destroy(&id, request.force, wait).await?,
            DesiredState::Restarted => self.restart(&id, request.force, wait).await?,
            DesiredState::Killed => self.kill(&id, wait).await?,
        };

        tracing::info!(app_id = %id, state = %state, changed = result.changed, "Reconciled app");

        Ok(ReconcileOutcome {
            uri: self.uri.clone(),
            state,
            result,
        })
    }
}

/// Pass a 2xx response through, turn anything else into a transport error.
fn accept(
    operation: Operation,
    id: &AppId,
    response: ApiResponse,
    request: Option<&Value>,
) -> Result<ApiResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(rejected(operation, id, response, request))
    }
}

fn rejected(
    operation: Operation,
    id: &AppId,
    response: ApiResponse,
    request: Option<&Value>,
) -> ReconcileError {
    tracing::error!(
        app_id = %id,
        operation = %operation,
        status = %response.status,
        message = %response.message,
        "Orchestrator rejected request"
    );
    ReconcileError::Transport {
        operation,
        app_id: id.clone(),
        status: response.status,
        message: response.message,
        response: response.body,
        request: request.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge_client::{Method, MockTransport, StatusCode};
    use serde_json::json;

    #[test]
    fn accept_passes_success_through() {
        let id = AppId::parse("/cache").unwrap();
        let response = ApiResponse::new(StatusCode::CREATED, json!({"id": "/cache"}));
        let accepted = accept(Operation::Create, &id, response, None).unwrap();
        assert_eq!(accepted.body["id"], "/cache");
    }

    #[test]
    fn accept_keeps_request_context() {
        let id = AppId::parse("/cache").unwrap();
        let response = ApiResponse::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"message": "Object is not valid"}),
        );
        let document = json!({"id": "/cache", "cpus": -1});

        let err = accept(Operation::Create, &id, response, Some(&document)).unwrap_err();
        let ReconcileError::Transport {
            operation,
            status,
            message,
            request,
            ..
        } = err
        else {
            panic!("expected transport error");
        };
        assert_eq!(operation, Operation::Create);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(message, "Object is not valid");
        assert_eq!(request, Some(document));
    }

    #[tokio::test]
    async fn uri_is_echoed() {
        let transport = Arc::new(MockTransport::new());
        transport.on_status(Method::DELETE, "/apps/cache?force=false", 404);
        let reconciler = Reconciler::new(
            transport,
            "http://marathon:8080/",
            &ReconcilerConfig::default(),
        );

        let request = ReconciliationRequest::new(
            converge_core::AppSpec::new("/cache"),
            DesiredState::Absent,
        );
        let outcome = reconciler.reconcile(&request).await.unwrap();
        assert_eq!(outcome.uri, "http://marathon:8080/");
        assert_eq!(reconciler.uri(), "http://marathon:8080/");
    }
}
