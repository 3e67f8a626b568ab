// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Cached views of a running application's model and live state.
//!
//! An application master answers many read-only queries about the
//! application it runs: its desired and resolved configuration, and the
//! containers, components and resources that are live right now. Computing
//! these from the authoritative [`ApplicationState`] on every query is
//! wasteful, so [`ApplicationResource`] serves them from [`freshet`] views
//! that are recomputed at most once per staleness window.
//!
//! | path                       | value                     | cached |
//! |----------------------------|---------------------------|--------|
//! | `model/desired`            | [`AggregateConf`]         | yes    |
//! | `model/resolved`           | [`AggregateConf`]         | yes    |
//! | `model/{desired,resolved}/appconf`   | [`ConfTree`]    | yes    |
//! | `model/{desired,resolved}/resources` | [`ConfTree`]    | yes    |
//! | `live/resources`           | [`ConfTree`]              | yes    |
//! | `live/containers`          | [`ContainerMap`]          | yes    |
//! | `live/components`          | [`ComponentMap`]          | yes    |
//! | `live/containers/{id}`     | [`ContainerInformation`]  | no     |
//! | `live/components/{name}`   | [`ComponentInformation`]  | no     |
//!
//! # Example
//!
//! ```
//! use std::{sync::Arc, time::Duration};
//!
//! use freshet_appstate::{ApplicationResource, ComponentInformation, ContainerInformation, InMemoryState, ViewConfig};
//! use tick::ClockControl;
//! # futures::executor::block_on(async {
//!
//! let state = Arc::new(InMemoryState::new());
//! state.upsert_component(ComponentInformation::new("worker", 1));
//! state.upsert_container(ContainerInformation::new("container_01", "worker", 1));
//!
//! let control = ClockControl::new();
//! let resource = ApplicationResource::new(state.clone(), &ViewConfig::default(), control.to_clock())?;
//!
//! let components = resource.live_components().await?;
//! assert_eq!(components["worker"].containers, ["container_01"]);
//!
//! // A new container shows up once the view is stale.
//! state.upsert_container(ContainerInformation::new("container_02", "worker", 1));
//! assert_eq!(resource.live_components().await?["worker"].containers.len(), 1);
//!
//! control.advance(Duration::from_millis(1000));
//! assert_eq!(resource.live_components().await?["worker"].containers.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

mod config;
mod model;
pub mod paths;
mod resource;
mod state;
mod views;

#[doc(inline)]
pub use config::{ViewConfig, WaitConfig};
#[doc(inline)]
pub use model::{
    AggregateConf, ComponentInformation, ConfSection, ConfTree, ContainerInformation, ContainerState, ModelKind, Options,
};
#[doc(inline)]
pub use resource::{ApplicationResource, ResourceError};
#[doc(inline)]
pub use state::{ApplicationState, InMemoryState, StateError};
#[doc(inline)]
pub use views::{AggregateModelView, AppConfView, ComponentMap, ContainerMap, LiveComponentsView, LiveContainersView, LiveResourcesView};
