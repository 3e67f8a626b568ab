// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Serializable application model and live state records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key/value options, ordered by key.
pub type Options = BTreeMap<String, String>;

/// A configuration tree: global options plus per-component overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfTree {
    /// Schema the tree follows.
    pub schema: String,
    /// Descriptive metadata, not interpreted.
    pub metadata: Options,
    /// Options that apply to every component.
    pub global: Options,
    /// Options of each component, keyed by component name.
    pub components: BTreeMap<String, Options>,
}

impl ConfTree {
    /// Returns the effective value of `option` for `component`.
    ///
    /// Component options override global ones.
    #[must_use]
    pub fn component_option(&self, component: &str, option: &str) -> Option<&str> {
        self.components
            .get(component)
            .and_then(|options| options.get(option))
            .or_else(|| self.global.get(option))
            .map(String::as_str)
    }

    /// Sets a global option, returning `self` for chaining.
    #[must_use]
    pub fn with_global(mut self, option: impl Into<String>, value: impl Into<String>) -> Self {
        self.global.insert(option.into(), value.into());
        self
    }

    /// Sets a component option, returning `self` for chaining.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>, option: impl Into<String>, value: impl Into<String>) -> Self {
        self.components
            .entry(component.into())
            .or_default()
            .insert(option.into(), value.into());
        self
    }
}

/// The complete model of an application: internal, application and resource configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregateConf {
    /// Name of the application.
    pub name: String,
    /// Settings used by the application master itself.
    pub internal: ConfTree,
    /// Application configuration.
    pub app_conf: ConfTree,
    /// Resource requirements: instance counts, memory, cores.
    pub resources: ConfTree,
}

/// Which part of an [`AggregateConf`] a view exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfSection {
    /// [`AggregateConf::app_conf`].
    AppConf,
    /// [`AggregateConf::resources`].
    Resources,
}

impl ConfSection {
    /// Returns the section of `conf`.
    #[must_use]
    pub fn of(self, conf: &AggregateConf) -> &ConfTree {
        match self {
            Self::AppConf => &conf.app_conf,
            Self::Resources => &conf.resources,
        }
    }
}

/// Which model a view reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// The model as submitted by the user.
    Desired,
    /// The desired model with defaults and references resolved.
    Resolved,
}

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    /// Allocated but not yet started.
    #[default]
    Allocated,
    /// Running.
    Live,
    /// Asked to stop, not yet gone.
    Stopping,
    /// Finished or failed.
    Completed,
}

/// One container owned by the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerInformation {
    /// Unique container id.
    pub container_id: String,
    /// Name of the component the container runs.
    pub component: String,
    /// Priority of that component; links the container to it.
    pub role_id: u32,
    /// Host the container runs on, once known.
    pub host: Option<String>,
    /// Lifecycle state.
    pub state: ContainerState,
    /// Creation time in milliseconds since the Unix epoch.
    pub create_time: u64,
    /// Exit code once the container completed.
    pub exit_code: Option<i32>,
}

impl ContainerInformation {
    /// Creates a live container record.
    #[must_use]
    pub fn new(container_id: impl Into<String>, component: impl Into<String>, role_id: u32) -> Self {
        Self {
            container_id: container_id.into(),
            component: component.into(),
            role_id,
            state: ContainerState::Live,
            ..Self::default()
        }
    }
}

/// The status of one component and the containers it owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentInformation {
    /// Component name.
    pub name: String,
    /// Priority, unique per component.
    pub priority: u32,
    /// Number of instances the model asks for.
    pub desired: u32,
    /// Number of instances running.
    pub actual: u32,
    /// Number of outstanding container requests.
    pub requested: u32,
    /// Number of instances that failed so far.
    pub failed: u32,
    /// Number of instances started so far.
    pub started: u32,
    /// Ids of the containers the component owns.
    pub containers: Vec<String>,
}

impl ComponentInformation {
    /// Creates a status record with no containers.
    #[must_use]
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
            ..Self::default()
        }
    }

    /// Replaces [`containers`](Self::containers) with the ids of the containers in
    /// `owned` that belong to this component.
    pub fn attach_containers<'a>(&mut self, owned: impl IntoIterator<Item = &'a ContainerInformation>) {
        self.containers = owned
            .into_iter()
            .filter(|container| container.role_id == self.priority)
            .map(|container| container.container_id.clone())
            .collect();
    }
}
