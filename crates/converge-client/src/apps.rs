//! Application repository.
//!
//! [`AppRepository`] maps lifecycle operations onto orchestrator endpoints.
//! It performs no polling and no interpretation: every method returns the
//! transport's [`ApiResponse`] verbatim.

use std::sync::Arc;

use converge_core::{AppId, AppSpec};
use serde_json::{json, Value};

use crate::error::Result;
use crate::transport::{ApiResponse, Method, Transport};

/// Lifecycle operations on `/apps`.
#[derive(Debug)]
pub struct AppRepository<T> {
    transport: Arc<T>,
}

impl<T> Clone for AppRepository<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> AppRepository<T> {
    /// Create a repository over the given transport.
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Get a reference to the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Render the wire document for a create or update.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid or the document cannot be
    /// serialized.
    pub fn render(&self, spec: &AppSpec) -> Result<Value> {
        Ok(Value::Object(spec.to_document()?))
    }

    /// Fetch the current definition, including its live deployments.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    pub async fn fetch(&self, id: &AppId) -> Result<ApiResponse> {
        tracing::debug!(app_id = %id, "Fetching app");
        self.transport
            .call(Method::GET, &app_path(id), None)
            .await
    }

    /// Create a new application. The orchestrator rejects duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    pub async fn create(&self, document: &Value) -> Result<ApiResponse> {
        tracing::debug!(app_id = ?document.get("id"), "Creating app");
        self.transport
            .call(Method::POST, "/apps", Some(document))
            .await
    }

    /// Replace the fields present in `document`.
    ///
    /// With `force`, the orchestrator overrides a deployment that currently
    /// holds the app.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    pub async fn update(&self, id: &AppId, document: &Value, force: bool) -> Result<ApiResponse> {
        tracing::debug!(app_id = %id, force, "Updating app");
        let path = format!("{}?force={force}", app_path(id));
        self.transport
            .call(Method::PUT, &path, Some(document))
            .await
    }

    /// Remove the application and all of its tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    pub async fn destroy(&self, id: &AppId, force: bool) -> Result<ApiResponse> {
        tracing::debug!(app_id = %id, force, "Destroying app");
        let path = format!("{}?force={force}", app_path(id));
        self.transport.call(Method::DELETE, &path, None).await
    }

    /// Restart every task of the application.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    pub async fn restart(&self, id: &AppId, force: bool) -> Result<ApiResponse> {
        tracing::debug!(app_id = %id, force, "Restarting app");
        let path = format!("{}/restart?force={force}", app_path(id));
        let body = json!({ "force": force });
        self.transport
            .call(Method::POST, &path, Some(&body))
            .await
    }

    /// Kill all running tasks of the application.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    pub async fn kill_tasks(&self, id: &AppId) -> Result<ApiResponse> {
        tracing::debug!(app_id = %id, "Killing app tasks");
        let path = format!("{}/tasks", app_path(id));
        self.transport.call(Method::DELETE, &path, None).await
    }

    /// List the stored versions of the application's definition.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    pub async fn versions(&self, id: &AppId) -> Result<ApiResponse> {
        let path = format!("{}/versions", app_path(id));
        self.transport.call(Method::GET, &path, None).await
    }
}

/// `/apps/<id>`; canonical ids already carry the leading slash.
fn app_path(id: &AppId) -> String {
    format!("/apps{id}")
}
