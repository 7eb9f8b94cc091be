//! REST client for the orchestrator.
//!
//! This crate provides the two lowest layers of converge:
//!
//! - [`Transport`]: issues JSON requests against `{uri}/v2` and returns the
//!   status and decoded body without judging it
//! - [`AppRepository`]: maps lifecycle operations onto `/apps` endpoints
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  AppRepository   │   fetch / create / update / destroy
//! │                  │   restart / kill_tasks / versions
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐     ┌──────────────────┐
//! │    Transport     │◀────│  MockTransport   │ (test-utils)
//! │    (trait)       │     └──────────────────┘
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │  HttpTransport   │   reqwest + basic auth + TLS policy
//! └────────┬─────────┘
//!          │ HTTP(S)
//! ┌────────▼─────────┐
//! │   Orchestrator   │
//! └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use converge_client::{AppRepository, ClientConfig, HttpTransport};
//! use converge_core::AppId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("http://marathon.mesos:8080").with_credentials("ops", "secret");
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let apps = AppRepository::new(transport);
//!
//! let response = apps.fetch(&AppId::parse("/cache")?).await?;
//! if response.is_not_found() {
//!     println!("/cache does not exist");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod apps;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod transport;

pub use apps::AppRepository;
pub use config::{ClientConfig, Credentials};
pub use error::{ClientError, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockTransport, RecordedCall};
pub use transport::{ApiResponse, HttpTransport, Method, StatusCode, Transport};
