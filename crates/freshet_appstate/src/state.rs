// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The authoritative application state the views are computed from.

use std::{
    collections::BTreeMap,
    fmt::Debug,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::RwLock;

use crate::model::{AggregateConf, ComponentInformation, ConfTree, ContainerInformation};

/// An error reported by an [`ApplicationState`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StateError {
    /// No container with this id is owned by the application.
    #[error("unknown container: {0}")]
    NoSuchContainer(String),

    /// No component with this name exists.
    #[error("unknown component: {0}")]
    NoSuchComponent(String),

    /// The state could not be read.
    #[error("application state unavailable: {0}")]
    Unavailable(String),
}

impl StateError {
    /// Returns `true` if the error reports a missing container or component.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoSuchContainer(_) | Self::NoSuchComponent(_))
    }
}

/// Read access to the state of a running application.
///
/// Every call reads the current state; implementations do no caching of
/// their own. Returned values are snapshots owned by the caller.
pub trait ApplicationState: Debug + Send + Sync + 'static {
    /// Returns the model as submitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read.
    fn desired_model(&self) -> Result<AggregateConf, StateError>;

    /// Returns the model with defaults and references resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read.
    fn resolved_model(&self) -> Result<AggregateConf, StateError>;

    /// Returns the resources currently in use.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read.
    fn live_resources(&self) -> Result<ConfTree, StateError>;

    /// Returns every container the application owns.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read.
    fn owned_containers(&self) -> Result<Vec<ContainerInformation>, StateError>;

    /// Returns the status of every component, without container ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read.
    fn component_statuses(&self) -> Result<Vec<ComponentInformation>, StateError>;

    /// Returns the container with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoSuchContainer`] if no such container is owned.
    fn container(&self, container_id: &str) -> Result<ContainerInformation, StateError>;

    /// Returns the status of the named component, without container ids.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoSuchComponent`] if no such component exists.
    fn component(&self, name: &str) -> Result<ComponentInformation, StateError>;
}

#[derive(Debug, Default)]
struct Contents {
    desired: AggregateConf,
    resolved: AggregateConf,
    live_resources: ConfTree,
    containers: BTreeMap<String, ContainerInformation>,
    components: BTreeMap<String, ComponentInformation>,
    outage: Option<String>,
}

/// An [`ApplicationState`] held in memory.
///
/// Every read is counted, which makes it easy to see how often the views
/// actually reach the state.
///
/// # Examples
///
/// ```
/// use freshet_appstate::{ApplicationState, ComponentInformation, ContainerInformation, InMemoryState};
///
/// let state = InMemoryState::new();
/// state.upsert_component(ComponentInformation::new("worker", 1));
/// state.upsert_container(ContainerInformation::new("container_01", "worker", 1));
///
/// assert_eq!(state.container("container_01")?.component, "worker");
/// assert_eq!(state.reads(), 1);
/// # Ok::<(), freshet_appstate::StateError>(())
/// ```
#[derive(Debug, Default)]
pub struct InMemoryState {
    contents: RwLock<Contents>,
    reads: AtomicU64,
}

impl InMemoryState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state with the given models.
    #[must_use]
    pub fn with_models(desired: AggregateConf, resolved: AggregateConf) -> Self {
        let state = Self::new();
        state.set_desired(desired);
        state.set_resolved(resolved);
        state
    }

    /// Returns how many reads were made through [`ApplicationState`].
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Replaces the desired model.
    pub fn set_desired(&self, desired: AggregateConf) {
        self.contents.write().desired = desired;
    }

    /// Replaces the resolved model.
    pub fn set_resolved(&self, resolved: AggregateConf) {
        self.contents.write().resolved = resolved;
    }

    /// Replaces the live resources.
    pub fn set_live_resources(&self, resources: ConfTree) {
        self.contents.write().live_resources = resources;
    }

    /// Inserts or replaces a container, keyed by its id.
    pub fn upsert_container(&self, container: ContainerInformation) {
        self.contents.write().containers.insert(container.container_id.clone(), container);
    }

    /// Removes a container, returning it if it was present.
    pub fn remove_container(&self, container_id: &str) -> Option<ContainerInformation> {
        self.contents.write().containers.remove(container_id)
    }

    /// Inserts or replaces a component, keyed by its name.
    pub fn upsert_component(&self, component: ComponentInformation) {
        self.contents.write().components.insert(component.name.clone(), component);
    }

    /// Makes every subsequent read fail with [`StateError::Unavailable`] until
    /// called again with `None`.
    pub fn set_outage(&self, reason: Option<String>) {
        self.contents.write().outage = reason;
    }

    fn read<R>(&self, f: impl FnOnce(&Contents) -> Result<R, StateError>) -> Result<R, StateError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let contents = self.contents.read();
        if let Some(reason) = &contents.outage {
            return Err(StateError::Unavailable(reason.clone()));
        }
        f(&contents)
    }
}

impl ApplicationState for InMemoryState {
    fn desired_model(&self) -> Result<AggregateConf, StateError> {
        self.read(|contents| Ok(contents.desired.clone()))
    }

    fn resolved_model(&self) -> Result<AggregateConf, StateError> {
        self.read(|contents| Ok(contents.resolved.clone()))
    }

    fn live_resources(&self) -> Result<ConfTree, StateError> {
        self.read(|contents| Ok(contents.live_resources.clone()))
    }

    fn owned_containers(&self) -> Result<Vec<ContainerInformation>, StateError> {
        self.read(|contents| Ok(contents.containers.values().cloned().collect()))
    }

    fn component_statuses(&self) -> Result<Vec<ComponentInformation>, StateError> {
        self.read(|contents| Ok(contents.components.values().cloned().collect()))
    }

    fn container(&self, container_id: &str) -> Result<ContainerInformation, StateError> {
        self.read(|contents| {
            contents
                .containers
                .get(container_id)
                .cloned()
                .ok_or_else(|| StateError::NoSuchContainer(container_id.to_owned()))
        })
    }

    fn component(&self, name: &str) -> Result<ComponentInformation, StateError> {
        self.read(|contents| {
            contents
                .components
                .get(name)
                .cloned()
                .ok_or_else(|| StateError::NoSuchComponent(name.to_owned()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_records_are_not_found() {
        let state = InMemoryState::new();

        assert_eq!(state.container("c9"), Err(StateError::NoSuchContainer("c9".into())));
        assert!(state.component("db").unwrap_err().is_not_found());
        assert_eq!(state.reads(), 2);
    }

    #[test]
    fn outage_fails_every_read() {
        let state = InMemoryState::new();
        state.upsert_container(ContainerInformation::new("c1", "worker", 1));
        state.set_outage(Some("store offline".into()));

        let error = state.container("c1").unwrap_err();
        assert_eq!(error, StateError::Unavailable("store offline".into()));
        assert!(!error.is_not_found());
        assert!(state.desired_model().is_err());

        state.set_outage(None);
        assert!(state.container("c1").is_ok());
    }

    #[test]
    fn containers_are_listed_by_id() {
        let state = InMemoryState::new();
        state.upsert_container(ContainerInformation::new("c2", "worker", 1));
        state.upsert_container(ContainerInformation::new("c1", "worker", 1));

        let ids: Vec<_> = state
            .owned_containers()
            .unwrap()
            .into_iter()
            .map(|container| container.container_id)
            .collect();
        assert_eq!(ids, ["c1", "c2"]);

        assert!(state.remove_container("c1").is_some());
        assert_eq!(state.owned_containers().unwrap().len(), 1);
    }
}
