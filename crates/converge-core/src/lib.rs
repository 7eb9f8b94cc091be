//! Core types for converge.
//!
//! This crate provides the foundational types shared by the client and the
//! reconciler:
//!
//! - **Identifiers**: canonical application paths and deployment ids
//! - **Application documents**: the typed [`AppSpec`] and its wire rendering
//! - **Error types**: validation and rendering failures
//!
//! # Example
//!
//! ```
//! use converge_core::{AppId, AppSpec};
//!
//! let id = AppId::parse("team/cache").unwrap();
//! assert_eq!(id.as_str(), "/team/cache");
//!
//! let spec = AppSpec::new("/team/cache")
//!     .with_docker_image("redis:6")
//!     .with_resources(0.5, 256.0);
//! let doc = spec.to_document().unwrap();
//! assert_eq!(doc["container"]["docker"]["image"], "redis:6");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod app;
mod coerce;
pub mod error;
pub mod ids;

pub use app::{
    AppSpec, Container, ContainerType, DockerContainer, DockerNetwork, DockerParameter,
    HealthCheck, PortDefinition, PortMapping, UpgradeStrategy,
};
pub use error::{CoreError, Result};
pub use ids::{AppId, DeploymentId, IdError};
