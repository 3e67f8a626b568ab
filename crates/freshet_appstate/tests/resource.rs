// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `ApplicationResource`.

use std::{sync::Arc, time::Duration};

use freshet_appstate::{
    AggregateConf, ApplicationResource, ComponentInformation, ConfTree, ContainerInformation, InMemoryState, ResourceError, ViewConfig,
    paths,
};
use futures::future::join_all;
use http::StatusCode;
use tick::{Clock, ClockControl};

fn populated_state() -> Arc<InMemoryState> {
    let desired = AggregateConf {
        name: "hbase".into(),
        app_conf: ConfTree::default().with_global("site.master.port", "${MASTER_PORT}"),
        resources: ConfTree::default()
            .with_component("master", "yarn.component.instances", "1")
            .with_component("worker", "yarn.component.instances", "2"),
        ..AggregateConf::default()
    };
    let resolved = AggregateConf {
        app_conf: ConfTree::default().with_global("site.master.port", "16000"),
        ..desired.clone()
    };

    let state = Arc::new(InMemoryState::with_models(desired, resolved));
    state.set_live_resources(ConfTree::default().with_component("worker", "yarn.memory", "1024"));
    state.upsert_component(ComponentInformation::new("master", 1));
    state.upsert_component(ComponentInformation::new("worker", 2));
    state.upsert_container(ContainerInformation::new("container_01", "master", 1));
    state.upsert_container(ContainerInformation::new("container_02", "worker", 2));
    state.upsert_container(ContainerInformation::new("container_03", "worker", 2));
    state
}

fn resource(state: &Arc<InMemoryState>, clock: Clock) -> ApplicationResource {
    ApplicationResource::new(Arc::clone(state) as _, &ViewConfig::default(), clock).unwrap()
}

#[tokio::test]
async fn model_views() {
    let state = populated_state();
    let resource = resource(&state, Clock::new_frozen());

    assert_eq!(resource.model_desired().await.unwrap().name, "hbase");
    assert_eq!(resource.model_resolved().await.unwrap().app_conf.global["site.master.port"], "16000");
    assert_eq!(resource.model_desired_appconf().await.unwrap().global["site.master.port"], "${MASTER_PORT}");
    assert_eq!(resource.model_resolved_appconf().await.unwrap().global["site.master.port"], "16000");
    assert_eq!(
        resource
            .model_desired_resources()
            .await
            .unwrap()
            .component_option("worker", "yarn.component.instances"),
        Some("2")
    );
    assert_eq!(
        resource
            .model_resolved_resources()
            .await
            .unwrap()
            .component_option("master", "yarn.component.instances"),
        Some("1")
    );
}

#[tokio::test]
async fn live_views() {
    let state = populated_state();
    let resource = resource(&state, Clock::new_frozen());

    let resources = resource.live_resources().await.unwrap();
    assert_eq!(resources.component_option("worker", "yarn.memory"), Some("1024"));

    let containers = resource.live_containers().await.unwrap();
    assert_eq!(containers.len(), 3);
    assert_eq!(containers["container_02"].component, "worker");

    let components = resource.live_components().await.unwrap();
    assert_eq!(components["master"].containers, ["container_01"]);
    assert_eq!(components["worker"].containers, ["container_02", "container_03"]);
}

#[tokio::test]
async fn view_queries_are_served_from_cache() {
    let control = ClockControl::new();
    let state = populated_state();
    let resource = resource(&state, control.to_clock());

    let results = join_all((0..20).map(|_| resource.live_containers())).await;
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(state.reads(), 1);

    control.advance(Duration::from_millis(500));
    resource.live_containers().await.unwrap();
    assert_eq!(state.reads(), 1);

    control.advance(Duration::from_millis(600));
    resource.live_containers().await.unwrap();
    assert_eq!(state.reads(), 2);
}

#[tokio::test]
async fn views_show_changes_once_stale() {
    let control = ClockControl::new();
    let state = populated_state();
    let resource = resource(&state, control.to_clock());

    assert_eq!(resource.live_containers().await.unwrap().len(), 3);
    state.remove_container("container_03");
    assert_eq!(resource.live_containers().await.unwrap().len(), 3);

    control.advance(Duration::from_millis(1000));
    assert_eq!(resource.live_containers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn point_queries_always_read_state() {
    let state = populated_state();
    let resource = resource(&state, Clock::new_frozen());

    assert_eq!(resource.live_container("container_02").unwrap().component, "worker");
    assert_eq!(resource.live_container("container_02").unwrap().role_id, 2);
    assert_eq!(state.reads(), 2);

    let worker = resource.live_component("worker").unwrap();
    assert_eq!(worker.priority, 2);
    assert_eq!(worker.containers, ["container_02", "container_03"]);
}

#[tokio::test]
async fn point_queries_report_missing_records() {
    let state = populated_state();
    let resource = resource(&state, Clock::new_frozen());

    let error = resource.live_container("container_99").unwrap_err();
    assert!(matches!(&error, ResourceError::NotFound(message) if message == "Unknown container: container_99"));
    assert_eq!(error.status(), StatusCode::NOT_FOUND);

    let error = resource.live_component("database").unwrap_err();
    assert!(matches!(&error, ResourceError::NotFound(message) if message == "Unknown component: database"));
    assert_eq!(error.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn state_outage_is_an_internal_error() {
    let state = populated_state();
    let resource = resource(&state, Clock::new_frozen());
    state.set_outage(Some("store offline".into()));

    let error = resource.live_container("container_01").unwrap_err();
    assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(matches!(&error, ResourceError::Internal { path, .. } if path == "live/containers/container_01"));

    let error = resource.live_components().await.unwrap_err();
    assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(matches!(&error, ResourceError::Internal { path, .. } if path == paths::LIVE_COMPONENTS));
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let control = ClockControl::new();
    let state = populated_state();
    let resource = resource(&state, control.to_clock());

    resource.model_desired().await.unwrap();
    let before = resource
        .views()
        .entry::<AggregateConf>(paths::MODEL_DESIRED)
        .unwrap()
        .peek()
        .unwrap();

    control.advance(Duration::from_millis(1500));
    state.set_outage(Some("store offline".into()));
    resource.model_desired().await.unwrap_err();

    let after = resource
        .views()
        .entry::<AggregateConf>(paths::MODEL_DESIRED)
        .unwrap()
        .peek()
        .unwrap();
    assert_eq!(before.refreshed_at(), after.refreshed_at());

    state.set_outage(None);
    assert_eq!(resource.model_desired().await.unwrap().name, "hbase");
}

#[tokio::test]
async fn json_dispatch() {
    let state = populated_state();
    let resource = resource(&state, Clock::new_frozen());

    assert_eq!(resource.get_json("/").await.unwrap(), serde_json::json!(["model", "live", "actions"]));
    assert_eq!(resource.get_json("model/").await.unwrap(), serde_json::json!(["desired", "resolved"]));
    assert_eq!(resource.get_json("/live").await.unwrap().as_array().map(Vec::len), Some(6));

    let desired = resource.get_json("/model/desired").await.unwrap();
    assert_eq!(desired["name"], "hbase");
    assert_eq!(desired["appConf"]["global"]["site.master.port"], "${MASTER_PORT}");

    let containers = resource.get_json("/live/containers").await.unwrap();
    assert_eq!(containers["container_01"]["component"], "master");

    let container = resource.get_json("/live/containers/container_03").await.unwrap();
    assert_eq!(container["containerId"], "container_03");

    let component = resource.get_json("/live/components/worker").await.unwrap();
    assert_eq!(component["containers"], serde_json::json!(["container_02", "container_03"]));

    for key in paths::VIEW_KEYS {
        resource.get_json(key).await.unwrap();
    }
}

#[tokio::test]
async fn json_dispatch_unknown_paths() {
    let state = populated_state();
    let resource = resource(&state, Clock::new_frozen());

    for path in ["/live/nodes", "/actions/stop", "/model/desired/unknown", "/live/containers/container_99"] {
        let error = resource.get_json(path).await.unwrap_err();
        assert_eq!(error.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn configured_staleness_applies_to_every_view() {
    let control = ClockControl::new();
    let state = populated_state();
    let config = ViewConfig::from_json(r#"{ "staleness_ms": 100 }"#).unwrap();
    let resource = ApplicationResource::new(Arc::clone(&state) as _, &config, control.to_clock()).unwrap();

    for key in paths::VIEW_KEYS {
        let staleness = match key {
            paths::MODEL_DESIRED | paths::MODEL_RESOLVED => resource.views().entry::<AggregateConf>(key).unwrap().staleness(),
            paths::LIVE_CONTAINERS => resource
                .views()
                .entry::<freshet_appstate::ContainerMap>(key)
                .unwrap()
                .staleness(),
            paths::LIVE_COMPONENTS => resource
                .views()
                .entry::<freshet_appstate::ComponentMap>(key)
                .unwrap()
                .staleness(),
            _ => resource.views().entry::<ConfTree>(key).unwrap().staleness(),
        };
        assert_eq!(staleness, Duration::from_millis(100), "{key}");
    }

    resource.live_resources().await.unwrap();
    control.advance(Duration::from_millis(100));
    resource.live_resources().await.unwrap();
    assert_eq!(state.reads(), 2);
}
