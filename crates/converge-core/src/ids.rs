//! Identifier types for converge.
//!
//! Applications are addressed by slash-separated paths (`/team/cache`), and
//! deployments by opaque strings handed out by the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A canonical application path such as `/team/cache`.
///
/// The canonical form always has exactly one leading slash, no trailing
/// slash and no empty segments. Relative ids (`cache`) are anchored at the
/// root, which matches how the orchestrator resolves them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);

impl AppId {
    /// Parse and canonicalise an application path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty or any segment contains
    /// characters the orchestrator rejects.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let trimmed = s.trim();
        let path = trimmed.trim_start_matches('/').trim_end_matches('/');
        if path.is_empty() {
            return Err(IdError::Empty);
        }

        let mut canonical = String::with_capacity(path.len() + 1);
        for segment in path.split('/') {
            validate_segment(segment)?;
            canonical.push('/');
            canonical.push_str(segment);
        }

        Ok(Self(canonical))
    }

    /// Return the canonical path, including the leading slash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').skip(1)
    }
}

fn validate_segment(segment: &str) -> Result<(), IdError> {
    if segment.is_empty() {
        return Err(IdError::EmptySegment);
    }

    let valid_chars = segment
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let valid_edges = !segment.starts_with(['-', '.']) && !segment.ends_with(['-', '.']);

    if valid_chars && valid_edges {
        Ok(())
    } else {
        Err(IdError::InvalidSegment(segment.to_string()))
    }
}

impl FromStr for AppId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AppId({})", self.0)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AppId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AppId> for String {
    fn from(id: AppId) -> Self {
        id.0
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An orchestrator-assigned deployment identifier.
///
/// Deployment ids are opaque; the only thing converge does with them is
/// check whether they are still listed as in flight.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(String);

impl DeploymentId {
    /// Wrap an orchestrator-provided deployment id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeploymentId({})", self.0)
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeploymentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeploymentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The id is empty or consists only of slashes.
    #[error("application id must not be empty")]
    Empty,

    /// The path contains `//`.
    #[error("application id contains an empty path segment")]
    EmptySegment,

    /// A path segment uses characters the orchestrator does not accept.
    #[error("invalid application id segment: {0:?}")]
    InvalidSegment(String),
}
