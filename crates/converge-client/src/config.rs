//! Orchestrator connection configuration.
//!
//! This module defines the explicit configuration value threaded through
//! every request: endpoint, credentials, TLS policy and timeouts.

use std::time::Duration;

use serde::Deserialize;

/// Path segment appended to the orchestrator URI.
pub const API_VERSION: &str = "v2";

/// Configuration for talking to the orchestrator.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URI of the orchestrator (e.g., `http://marathon.mesos:8080`).
    #[serde(default = "ClientConfig::default_uri")]
    pub uri: String,

    /// Username for HTTP Basic auth. Auth is only sent when this is set.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for HTTP Basic auth.
    #[serde(default)]
    pub password: Option<String>,

    /// Validate TLS certificates. Only disable for test clusters.
    #[serde(default = "ClientConfig::default_validate_certs")]
    pub validate_certs: bool,

    /// Request timeout in seconds.
    #[serde(default = "ClientConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Connect timeout in seconds.
    #[serde(default = "ClientConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// Basic auth credentials.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    /// Username.
    pub username: &'a str,
    /// Password, empty when not configured.
    pub password: &'a str,
}

impl ClientConfig {
    /// Create a configuration for the given URI with default settings.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Set basic auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    fn default_uri() -> String {
        "http://localhost:8080".to_string()
    }

    const fn default_validate_certs() -> bool {
        true
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_connect_timeout() -> u64 {
        5
    }

    /// The URI with a trailing slash, as echoed back to callers.
    #[must_use]
    pub fn normalized_uri(&self) -> String {
        if self.uri.ends_with('/') {
            self.uri.clone()
        } else {
            format!("{}/", self.uri)
        }
    }

    /// The REST base all paths are appended to, e.g. `http://host:8080/v2`.
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("{}{API_VERSION}", self.normalized_uri())
    }

    /// Credentials for basic auth, if a username is configured.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        self.username.as_deref().map(|username| Credentials {
            username,
            password: self.password.as_deref().unwrap_or_default(),
        })
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the connect timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            username: None,
            password: None,
            validate_certs: Self::default_validate_certs(),
            request_timeout_seconds: Self::default_request_timeout(),
            connect_timeout_seconds: Self::default_connect_timeout(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("validate_certs", &self.validate_certs)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish()
    }
}
