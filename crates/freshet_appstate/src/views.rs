// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The refreshable views of the application state.

use std::{collections::BTreeMap, sync::Arc};

use freshet::{BoxError, RefreshableView};

use crate::{
    model::{AggregateConf, ComponentInformation, ConfSection, ConfTree, ContainerInformation, ModelKind},
    state::{ApplicationState, StateError},
};

/// Live containers keyed by container id.
pub type ContainerMap = BTreeMap<String, ContainerInformation>;

/// Live components keyed by name, each with the ids of its containers.
pub type ComponentMap = BTreeMap<String, ComponentInformation>;

/// The whole desired or resolved model.
#[derive(Debug, Clone)]
pub struct AggregateModelView {
    state: Arc<dyn ApplicationState>,
    model: ModelKind,
}

impl AggregateModelView {
    /// Creates a view of `model`.
    pub fn new(state: Arc<dyn ApplicationState>, model: ModelKind) -> Self {
        Self { state, model }
    }
}

impl RefreshableView for AggregateModelView {
    type Value = AggregateConf;

    async fn refresh(&self) -> Result<AggregateConf, BoxError> {
        Ok(read_model(&*self.state, self.model)?)
    }
}

/// One section of the desired or resolved model.
#[derive(Debug, Clone)]
pub struct AppConfView {
    state: Arc<dyn ApplicationState>,
    model: ModelKind,
    section: ConfSection,
}

impl AppConfView {
    /// Creates a view of `section` of `model`.
    pub fn new(state: Arc<dyn ApplicationState>, model: ModelKind, section: ConfSection) -> Self {
        Self { state, model, section }
    }
}

impl RefreshableView for AppConfView {
    type Value = ConfTree;

    async fn refresh(&self) -> Result<ConfTree, BoxError> {
        let conf = read_model(&*self.state, self.model)?;
        Ok(self.section.of(&conf).clone())
    }
}

/// The resources in use right now.
#[derive(Debug, Clone)]
pub struct LiveResourcesView {
    state: Arc<dyn ApplicationState>,
}

impl LiveResourcesView {
    /// Creates the view.
    pub fn new(state: Arc<dyn ApplicationState>) -> Self {
        Self { state }
    }
}

impl RefreshableView for LiveResourcesView {
    type Value = ConfTree;

    async fn refresh(&self) -> Result<ConfTree, BoxError> {
        Ok(self.state.live_resources()?)
    }
}

/// Every owned container, keyed by id.
#[derive(Debug, Clone)]
pub struct LiveContainersView {
    state: Arc<dyn ApplicationState>,
}

impl LiveContainersView {
    /// Creates the view.
    pub fn new(state: Arc<dyn ApplicationState>) -> Self {
        Self { state }
    }
}

impl RefreshableView for LiveContainersView {
    type Value = ContainerMap;

    async fn refresh(&self) -> Result<ContainerMap, BoxError> {
        let containers = self.state.owned_containers()?;
        Ok(containers
            .into_iter()
            .map(|container| (container.container_id.clone(), container))
            .collect())
    }
}

/// Every component, keyed by name, with the ids of the containers it owns.
#[derive(Debug, Clone)]
pub struct LiveComponentsView {
    state: Arc<dyn ApplicationState>,
}

impl LiveComponentsView {
    /// Creates the view.
    pub fn new(state: Arc<dyn ApplicationState>) -> Self {
        Self { state }
    }
}

impl RefreshableView for LiveComponentsView {
    type Value = ComponentMap;

    async fn refresh(&self) -> Result<ComponentMap, BoxError> {
        let containers = self.state.owned_containers()?;
        let components = self.state.component_statuses()?;

        Ok(components
            .into_iter()
            .map(|mut component| {
                component.attach_containers(&containers);
                (component.name.clone(), component)
            })
            .collect())
    }
}

fn read_model(state: &dyn ApplicationState, model: ModelKind) -> Result<AggregateConf, StateError> {
    match model {
        ModelKind::Desired => state.desired_model(),
        ModelKind::Resolved => state.resolved_model(),
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::InMemoryState;

    fn state() -> Arc<InMemoryState> {
        let desired = AggregateConf {
            name: "hbase".into(),
            app_conf: ConfTree::default().with_global("site.port", "${PORT}"),
            resources: ConfTree::default().with_component("worker", "yarn.component.instances", "2"),
            ..AggregateConf::default()
        };
        let resolved = AggregateConf {
            app_conf: ConfTree::default().with_global("site.port", "8080"),
            ..desired.clone()
        };

        let state = Arc::new(InMemoryState::with_models(desired, resolved));
        state.upsert_component(ComponentInformation::new("master", 1));
        state.upsert_component(ComponentInformation::new("worker", 2));
        state.upsert_container(ContainerInformation::new("c1", "master", 1));
        state.upsert_container(ContainerInformation::new("c2", "worker", 2));
        state.upsert_container(ContainerInformation::new("c3", "worker", 2));
        state
    }

    #[test]
    fn model_views_pick_model_and_section() {
        let state = state();

        let resolved = block_on(AggregateModelView::new(state.clone(), ModelKind::Resolved).refresh()).unwrap();
        assert_eq!(resolved.app_conf.global["site.port"], "8080");

        let desired_conf = block_on(AppConfView::new(state.clone(), ModelKind::Desired, ConfSection::AppConf).refresh()).unwrap();
        assert_eq!(desired_conf.global["site.port"], "${PORT}");

        let resources = block_on(AppConfView::new(state, ModelKind::Resolved, ConfSection::Resources).refresh()).unwrap();
        assert_eq!(resources.component_option("worker", "yarn.component.instances"), Some("2"));
    }

    #[test]
    fn containers_are_keyed_by_id() {
        let containers = block_on(LiveContainersView::new(state()).refresh()).unwrap();

        assert_eq!(containers.keys().collect::<Vec<_>>(), ["c1", "c2", "c3"]);
        assert_eq!(containers["c2"].component, "worker");
    }

    #[test]
    fn components_carry_their_containers() {
        let components = block_on(LiveComponentsView::new(state()).refresh()).unwrap();

        assert_eq!(components["master"].containers, ["c1"]);
        assert_eq!(components["worker"].containers, ["c2", "c3"]);
    }

    #[test]
    fn state_failures_surface_as_refresh_errors() {
        let state = state();
        state.set_outage(Some("store offline".into()));

        let error = block_on(LiveResourcesView::new(state).refresh()).unwrap_err();
        let error = error.downcast::<StateError>().unwrap();
        assert_eq!(*error, StateError::Unavailable("store offline".into()));
    }
}
