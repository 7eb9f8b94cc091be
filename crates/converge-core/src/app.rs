//! Application documents.
//!
//! [`AppSpec`] is the desired definition of an application. Known
//! orchestrator properties are typed; anything else rides along in
//! [`AppSpec::extra`]. Rendering with [`AppSpec::to_document`] produces the
//! wire document sent on create and update.
//!
//! # Merge semantics
//!
//! Only top-level values that carry information are sent: unset fields,
//! `false`, numeric zero, empty strings, empty arrays and empty objects are
//! dropped. The orchestrator keeps its current value for every dropped field,
//! so an update never nulls out something the caller did not mention.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::ids::{AppId, IdError};

/// Default docker network mode for the `docker_image` shorthand.
pub const DEFAULT_DOCKER_NETWORK: DockerNetwork = DockerNetwork::None;

/// Desired definition of an application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// Slash-separated application path.
    #[serde(default)]
    pub id: String,

    /// Shell command to run.
    #[serde(default, alias = "command", skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// Command in exec form, used instead of `cmd`.
    #[serde(default, alias = "arguments", skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// CPU shares per instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus: Option<f64>,
    /// Memory in MB per instance.
    #[serde(default, alias = "memory", skip_serializing_if = "Option::is_none")]
    pub mem: Option<f64>,
    /// Disk in MB per instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<f64>,
    /// Number of instances to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,

    /// Host ports.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_ints",
        skip_serializing_if = "Option::is_none"
    )]
    pub ports: Option<Vec<u32>>,
    /// Use `ports` as literal host ports.
    #[serde(default, alias = "require_ports", skip_serializing_if = "Option::is_none")]
    pub require_ports: Option<bool>,
    /// Port resources requested on the agent host.
    #[serde(default, alias = "port_definitions", skip_serializing_if = "Option::is_none")]
    pub port_definitions: Option<Vec<PortDefinition>>,
    /// Per-task IP address request.
    #[serde(default, alias = "ip_address", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<Value>,

    /// Executor used to launch tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    /// User to launch tasks as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Full container definition. Takes precedence over the docker shorthand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
    /// Residency settings for local persistent volumes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residency: Option<Value>,

    /// Environment variables. Numbers and booleans are stored as strings.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_string_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub env: Option<BTreeMap<String, String>>,
    /// Placement constraints such as `["hostname", "UNIQUE"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<Vec<String>>>,
    /// Accepted resource roles.
    #[serde(
        default,
        alias = "accepted_resource_roles",
        skip_serializing_if = "Option::is_none"
    )]
    pub accepted_resource_roles: Option<Vec<String>>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    /// URIs fetched before launch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,
    /// Artifact store URLs.
    #[serde(default, alias = "store_urls", skip_serializing_if = "Option::is_none")]
    pub store_urls: Option<Vec<String>>,
    /// Applications this one depends on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    /// Fetcher entries (`uri`, `executable`, `extract`, `cache`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<Vec<Value>>,

    /// Health checks.
    #[serde(default, alias = "health_checks", skip_serializing_if = "Option::is_none")]
    pub health_checks: Option<Vec<HealthCheck>>,
    /// Readiness checks.
    #[serde(default, alias = "readiness_checks", skip_serializing_if = "Option::is_none")]
    pub readiness_checks: Option<Vec<Value>>,

    /// Initial launch backoff.
    #[serde(default, alias = "backoff_seconds", skip_serializing_if = "Option::is_none")]
    pub backoff_seconds: Option<f64>,
    /// Backoff multiplier.
    #[serde(default, alias = "backoff_factor", skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,
    /// Backoff ceiling.
    #[serde(
        default,
        alias = "max_launch_delay_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_launch_delay_seconds: Option<f64>,
    /// Rolling upgrade behaviour.
    #[serde(default, alias = "upgrade_strategy", skip_serializing_if = "Option::is_none")]
    pub upgrade_strategy: Option<UpgradeStrategy>,

    /// Definition version timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Detailed version information.
    #[serde(default, alias = "version_info", skip_serializing_if = "Option::is_none")]
    pub version_info: Option<Value>,

    /// Docker image; expands into a full `container` when none is given.
    #[serde(default, rename = "docker_image", skip_serializing)]
    pub docker_image: Option<String>,
    /// Docker shorthand: pull the image before each launch.
    #[serde(
        default,
        rename = "docker_force_pull_image",
        alias = "docker_forcePullImage",
        skip_serializing
    )]
    pub docker_force_pull_image: bool,
    /// Docker shorthand: run privileged.
    #[serde(default, rename = "docker_privileged", skip_serializing)]
    pub docker_privileged: bool,
    /// Docker shorthand: network mode, `NONE` when unset.
    #[serde(default, rename = "docker_network", skip_serializing)]
    pub docker_network: Option<DockerNetwork>,
    /// Docker shorthand: extra `docker run` parameters.
    #[serde(default, rename = "docker_parameters", skip_serializing)]
    pub docker_parameters: Vec<DockerParameter>,
    /// Docker shorthand: port mappings.
    #[serde(
        default,
        rename = "docker_port_mappings",
        alias = "docker_portMappings",
        skip_serializing
    )]
    pub docker_port_mappings: Vec<PortMapping>,
    /// Container type used when only `container_volumes` is given.
    #[serde(default, rename = "container_type", skip_serializing)]
    pub container_type: Option<ContainerType>,
    /// Container volumes for the shorthand container.
    #[serde(default, rename = "container_volumes", skip_serializing)]
    pub container_volumes: Vec<Value>,
    /// Merged into `upgradeStrategy.minimumHealthCapacity`.
    #[serde(
        default,
        rename = "upgrade_strategy_minimum_health_capacity",
        alias = "upgradeStrategy_minimumHealthCapacity",
        skip_serializing
    )]
    pub upgrade_strategy_minimum_health_capacity: Option<f64>,
    /// Merged into `upgradeStrategy.maximumOverCapacity`.
    #[serde(
        default,
        rename = "upgrade_strategy_maximum_over_capacity",
        alias = "upgradeStrategy_maximumOverCapacity",
        skip_serializing
    )]
    pub upgrade_strategy_maximum_over_capacity: Option<f64>,

    /// Fields the typed model does not know about, passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppSpec {
    /// Create an empty definition for the given path.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the shell command.
    #[must_use]
    pub fn with_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = Some(cmd.into());
        self
    }

    /// Set CPU and memory per instance.
    #[must_use]
    pub fn with_resources(mut self, cpus: f64, mem: f64) -> Self {
        self.cpus = Some(cpus);
        self.mem = Some(mem);
        self
    }

    /// Set the instance count.
    #[must_use]
    pub fn with_instances(mut self, instances: u32) -> Self {
        self.instances = Some(instances);
        self
    }

    /// Run the application from a docker image.
    #[must_use]
    pub fn with_docker_image(mut self, image: impl Into<String>) -> Self {
        self.docker_image = Some(image.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Add a field the typed model does not cover.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Parse the application path.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is missing or malformed.
    pub fn app_id(&self) -> std::result::Result<AppId, IdError> {
        AppId::parse(&self.id)
    }

    /// Render the wire document for create and update requests.
    ///
    /// Shorthands are expanded, empty values are dropped and `id` is
    /// replaced by its canonical form.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid or the document cannot be
    /// serialized.
    pub fn to_document(&self) -> Result<Map<String, Value>> {
        let id = self.app_id()?;

        let Value::Object(mut doc) = serde_json::to_value(self)? else {
            return Err(CoreError::NotAnObject);
        };

        if self.container.is_none() {
            if let Some(container) = self.shorthand_container() {
                doc.insert("container".to_string(), serde_json::to_value(container)?);
            }
        }

        self.merge_upgrade_strategy(&mut doc);

        doc.retain(|_, value| is_set(value));
        doc.insert("id".to_string(), Value::String(id.into()));
        Ok(doc)
    }

    /// Build a container from the docker or volume shorthands.
    fn shorthand_container(&self) -> Option<Container> {
        if let Some(image) = &self.docker_image {
            return Some(Container {
                kind: ContainerType::Docker,
                docker: Some(DockerContainer {
                    image: image.clone(),
                    network: Some(self.docker_network.unwrap_or(DEFAULT_DOCKER_NETWORK)),
                    force_pull_image: self.docker_force_pull_image,
                    privileged: self.docker_privileged,
                    parameters: self.docker_parameters.clone(),
                    port_mappings: self.docker_port_mappings.clone(),
                }),
                volumes: self.container_volumes.clone(),
                extra: Map::new(),
            });
        }

        if self.container_volumes.is_empty() {
            return None;
        }

        Some(Container {
            kind: self.container_type.unwrap_or_default(),
            docker: None,
            volumes: self.container_volumes.clone(),
            extra: Map::new(),
        })
    }

    fn merge_upgrade_strategy(&self, doc: &mut Map<String, Value>) {
        let overrides = [
            ("minimumHealthCapacity", self.upgrade_strategy_minimum_health_capacity),
            ("maximumOverCapacity", self.upgrade_strategy_maximum_over_capacity),
        ];

        for (key, value) in overrides {
            let Some(value) = value else { continue };
            let entry = doc
                .entry("upgradeStrategy")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(strategy) = entry {
                strategy.insert(key.to_string(), Value::from(value));
            }
        }
    }
}

/// Whether a top-level value carries information worth sending.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Container type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerType {
    /// Docker containerizer.
    Docker,
    /// Mesos containerizer.
    #[default]
    Mesos,
}

/// Docker network mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DockerNetwork {
    /// Bridged networking with port mappings.
    Bridge,
    /// Host networking.
    Host,
    /// No networking.
    None,
    /// User-defined network.
    User,
}

/// Container definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Containerizer to use.
    #[serde(rename = "type", default)]
    pub kind: ContainerType,
    /// Docker-specific settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerContainer>,
    /// Volume definitions.
    #[serde(default)]
    pub volumes: Vec<Value>,
    /// Unmodelled container fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Docker settings of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerContainer {
    /// Image reference.
    pub image: String,
    /// Network mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<DockerNetwork>,
    /// Pull the image before each launch.
    #[serde(default)]
    pub force_pull_image: bool,
    /// Run privileged.
    #[serde(default)]
    pub privileged: bool,
    /// Extra `docker run` parameters.
    #[serde(default)]
    pub parameters: Vec<DockerParameter>,
    /// Port mappings.
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
}

/// A `docker run` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerParameter {
    /// Parameter name without leading dashes.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

/// A container port mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Port inside the container.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub container_port: Option<u32>,
    /// Port on the host; 0 asks for a random port.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub host_port: Option<u32>,
    /// Service port used by load balancers.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_port: Option<u32>,
    /// `tcp`, `udp` or `udp,tcp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Port name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// A host port resource request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDefinition {
    /// Port number; 0 asks for a dynamic port.
    #[serde(deserialize_with = "crate::coerce::int")]
    pub port: u32,
    /// `tcp`, `udp` or `udp,tcp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Port name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// A task health check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    /// `HTTP`, `HTTPS`, `TCP` or `COMMAND`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// HTTP path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Index into the app's ports.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub port_index: Option<u32>,
    /// Fixed port to probe.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u32>,
    /// Command for `COMMAND` checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Value>,
    /// Seconds to ignore failures after a task starts.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub grace_period_seconds: Option<u32>,
    /// Seconds between checks.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub interval_seconds: Option<u32>,
    /// Seconds before a check counts as failed.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout_seconds: Option<u32>,
    /// Failures tolerated before the task is killed.
    #[serde(
        default,
        deserialize_with = "crate::coerce::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_consecutive_failures: Option<u32>,
    /// Unmodelled health check fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rolling upgrade behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeStrategy {
    /// Fraction of instances that must stay healthy during an upgrade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_health_capacity: Option<f64>,
    /// Fraction of extra instances that may be started during an upgrade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_over_capacity: Option<f64>,
}
