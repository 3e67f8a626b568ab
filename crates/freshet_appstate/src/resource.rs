// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Query entry points for the application's model and live state.

use std::sync::Arc;

use freshet::{BoxError, ViewRegistry};
use http::StatusCode;
use serde::Serialize;
use tick::Clock;

use crate::{
    config::ViewConfig,
    model::{AggregateConf, ComponentInformation, ConfSection, ConfTree, ContainerInformation, ModelKind},
    paths::{
        LIVE_COMPONENTS, LIVE_CONTAINERS, LIVE_ENTRIES, LIVE_RESOURCES, MODEL_DESIRED, MODEL_DESIRED_APPCONF, MODEL_DESIRED_RESOURCES,
        MODEL_ENTRIES, MODEL_RESOLVED, MODEL_RESOLVED_APPCONF, MODEL_RESOLVED_RESOURCES, ROOT_ENTRIES,
    },
    state::{ApplicationState, StateError},
    views::{AggregateModelView, AppConfView, ComponentMap, ContainerMap, LiveComponentsView, LiveContainersView, LiveResourcesView},
};

/// An error returned to a query.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// The requested container, component or path does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The query failed for any other reason.
    #[error("failed to serve {path}")]
    Internal {
        /// The path that was queried.
        path: String,
        /// What went wrong.
        #[source]
        source: BoxError,
    },
}

impl ResourceError {
    /// Returns the HTTP status code that reports this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn internal(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        let path = path.into();
        let source = source.into();
        tracing::warn!(resource.path = %path, error = %source, "resource.failed");
        Self::Internal { path, source }
    }
}

/// The model and live state of one application.
///
/// Listings are constant. The nine model and live views are served from a
/// [`ViewRegistry`], so each is recomputed at most once per staleness window
/// no matter how many queries arrive. Queries for a single container or
/// component always read the application state directly.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use freshet_appstate::{ApplicationResource, ContainerInformation, InMemoryState, ViewConfig};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let state = Arc::new(InMemoryState::new());
/// state.upsert_container(ContainerInformation::new("container_01", "worker", 1));
///
/// let resource = ApplicationResource::new(state.clone(), &ViewConfig::default(), Clock::new_frozen())?;
///
/// let containers = resource.live_containers().await?;
/// assert!(containers.contains_key("container_01"));
///
/// let missing = resource.live_container("container_02").unwrap_err();
/// assert_eq!(missing.status(), http::StatusCode::NOT_FOUND);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug)]
pub struct ApplicationResource {
    state: Arc<dyn ApplicationState>,
    views: ViewRegistry,
}

impl ApplicationResource {
    /// Creates the resource and registers its nine views.
    ///
    /// # Errors
    ///
    /// Returns an error if a view key is registered twice.
    pub fn new(state: Arc<dyn ApplicationState>, config: &ViewConfig, clock: Clock) -> freshet::Result<Self> {
        let views = ViewRegistry::builder(clock)
            .options(config.options())
            .register(LIVE_RESOURCES, LiveResourcesView::new(Arc::clone(&state)))?
            .register(LIVE_CONTAINERS, LiveContainersView::new(Arc::clone(&state)))?
            .register(LIVE_COMPONENTS, LiveComponentsView::new(Arc::clone(&state)))?
            .register(MODEL_DESIRED, AggregateModelView::new(Arc::clone(&state), ModelKind::Desired))?
            .register(MODEL_RESOLVED, AggregateModelView::new(Arc::clone(&state), ModelKind::Resolved))?
            .register(
                MODEL_RESOLVED_APPCONF,
                AppConfView::new(Arc::clone(&state), ModelKind::Resolved, ConfSection::AppConf),
            )?
            .register(
                MODEL_RESOLVED_RESOURCES,
                AppConfView::new(Arc::clone(&state), ModelKind::Resolved, ConfSection::Resources),
            )?
            .register(
                MODEL_DESIRED_APPCONF,
                AppConfView::new(Arc::clone(&state), ModelKind::Desired, ConfSection::AppConf),
            )?
            .register(
                MODEL_DESIRED_RESOURCES,
                AppConfView::new(Arc::clone(&state), ModelKind::Desired, ConfSection::Resources),
            )?
            .build();

        Ok(Self { state, views })
    }

    /// Returns the registry holding the cached views.
    #[must_use]
    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Lists the application root.
    #[must_use]
    pub fn root(&self) -> &'static [&'static str] {
        mark("");
        &ROOT_ENTRIES
    }

    /// Lists the models.
    #[must_use]
    pub fn model(&self) -> &'static [&'static str] {
        mark("model");
        &MODEL_ENTRIES
    }

    /// Lists the live state.
    #[must_use]
    pub fn live(&self) -> &'static [&'static str] {
        mark("live");
        &LIVE_ENTRIES
    }

    /// Returns the desired model.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Internal`] if the view cannot be refreshed.
    pub async fn model_desired(&self) -> Result<Arc<AggregateConf>, ResourceError> {
        self.view(MODEL_DESIRED).await
    }

    /// Returns the application configuration of the desired model.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Internal`] if the view cannot be refreshed.
    pub async fn model_desired_appconf(&self) -> Result<Arc<ConfTree>, ResourceError> {
        self.view(MODEL_DESIRED_APPCONF).await
    }

    /// Returns the resources of the desired model.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Internal`] if the view cannot be refreshed.
    pub async fn model_desired_resources(&self) -> Result<Arc<ConfTree>, ResourceError> {
        self.view(MODEL_DESIRED_RESOURCES).await
    }

    /// Returns the resolved model.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Internal`] if the view cannot be refreshed.
    pub async fn model_resolved(&self) -> Result<Arc<AggregateConf>, ResourceError> {
        self.view(MODEL_RESOLVED).await
    }

    /// Returns the application configuration of the resolved model.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Internal`] if the view cannot be refreshed.
    pub async fn model_resolved_appconf(&self) -> Result<Arc<ConfTree>, ResourceError> {
        self.view(MODEL_RESOLVED_APPCONF).await
    }

    /// Returns the resources of the resolved model.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Internal`] if the view cannot be refreshed.
    pub async fn model_resolved_resources(&self) -> Result<Arc<ConfTree>, ResourceError> {
        self.view(MODEL_RESOLVED_RESOURCES).await
    }

    /// Returns the resources in use.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Internal`] if the view cannot be refreshed.
    pub async fn live_resources(&self) -> Result<Arc<ConfTree>, ResourceError> {
        self.view(LIVE_RESOURCES).await
    }

    /// Returns every owned container, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Internal`] if the view cannot be refreshed.
    pub async fn live_containers(&self) -> Result<Arc<ContainerMap>, ResourceError> {
        self.view(LIVE_CONTAINERS).await
    }

    /// Returns every component, keyed by name, with its containers.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Internal`] if the view cannot be refreshed.
    pub async fn live_components(&self) -> Result<Arc<ComponentMap>, ResourceError> {
        self.view(LIVE_COMPONENTS).await
    }

    /// Returns one container, read directly from the application state.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if no such container is owned and
    /// [`ResourceError::Internal`] for any other failure.
    pub fn live_container(&self, container_id: &str) -> Result<ContainerInformation, ResourceError> {
        let path = format!("{LIVE_CONTAINERS}/{container_id}");
        mark(&path);

        self.state.container(container_id).map_err(|error| point_query_error(path, error))
    }

    /// Returns one component with the ids of its containers, read directly
    /// from the application state.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if no such component exists and
    /// [`ResourceError::Internal`] for any other failure.
    pub fn live_component(&self, name: &str) -> Result<ComponentInformation, ResourceError> {
        let path = format!("{LIVE_COMPONENTS}/{name}");
        mark(&path);

        let mut component = self.state.component(name).map_err(|error| point_query_error(path.clone(), error))?;
        let owned = self.state.owned_containers().map_err(|error| point_query_error(path, error))?;
        component.attach_containers(&owned);
        Ok(component)
    }

    /// Serves any path below the application root as JSON.
    ///
    /// Leading and trailing slashes are ignored. Containers and components
    /// are addressed as `live/containers/{id}` and `live/components/{name}`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] for unknown paths and missing
    /// containers or components, and [`ResourceError::Internal`] for any
    /// other failure.
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value, ResourceError> {
        let path = path.trim_matches('/');
        match path {
            "" => to_json(path, self.root()),
            "model" => to_json(path, self.model()),
            "live" => to_json(path, self.live()),
            MODEL_DESIRED => to_json(path, &*self.model_desired().await?),
            MODEL_RESOLVED => to_json(path, &*self.model_resolved().await?),
            MODEL_DESIRED_APPCONF => to_json(path, &*self.model_desired_appconf().await?),
            MODEL_DESIRED_RESOURCES => to_json(path, &*self.model_desired_resources().await?),
            MODEL_RESOLVED_APPCONF => to_json(path, &*self.model_resolved_appconf().await?),
            MODEL_RESOLVED_RESOURCES => to_json(path, &*self.model_resolved_resources().await?),
            LIVE_RESOURCES => to_json(path, &*self.live_resources().await?),
            LIVE_CONTAINERS => to_json(path, &*self.live_containers().await?),
            LIVE_COMPONENTS => to_json(path, &*self.live_components().await?),
            _ => {
                if let Some(container_id) = path.strip_prefix("live/containers/") {
                    to_json(path, &self.live_container(container_id)?)
                } else if let Some(name) = path.strip_prefix("live/components/") {
                    to_json(path, &self.live_component(name)?)
                } else {
                    Err(ResourceError::NotFound(format!("unknown resource: /{path}")))
                }
            }
        }
    }

    async fn view<T>(&self, key: &'static str) -> Result<Arc<T>, ResourceError>
    where
        T: Send + Sync + 'static,
    {
        mark(key);
        self.views.lookup::<T>(key).await.map_err(|error| ResourceError::internal(key, error))
    }
}

fn mark(path: &str) {
    tracing::debug!(resource.path = path, "resource.get");
}

fn point_query_error(path: String, error: StateError) -> ResourceError {
    match error {
        StateError::NoSuchContainer(id) => ResourceError::NotFound(format!("Unknown container: {id}")),
        StateError::NoSuchComponent(name) => ResourceError::NotFound(format!("Unknown component: {name}")),
        error => ResourceError::internal(path, error),
    }
}

fn to_json<T: Serialize + ?Sized>(path: &str, value: &T) -> Result<serde_json::Value, ResourceError> {
    serde_json::to_value(value).map_err(|error| ResourceError::internal(path, error))
}
