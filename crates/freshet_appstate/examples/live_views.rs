// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Serves the live views of a small application while its state changes.
//!
//! Run with `cargo run --example live_views` to see the `view.event` log
//! lines: most queries are hits, and the state is read again only once a
//! view is older than its staleness window.

use std::{sync::Arc, time::Duration};

use freshet_appstate::{
    AggregateConf, ApplicationResource, ComponentInformation, ConfTree, ContainerInformation, InMemoryState, ViewConfig,
};
use tick::Clock;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let model = AggregateConf {
        name: "demo".into(),
        resources: ConfTree::default().with_component("worker", "yarn.component.instances", "3"),
        ..AggregateConf::default()
    };
    let state = Arc::new(InMemoryState::with_models(model.clone(), model));
    state.upsert_component(ComponentInformation::new("worker", 1));

    let config = ViewConfig::from_json(r#"{ "staleness_ms": 300, "wait": { "mode": "wait" } }"#)?;
    let resource = Arc::new(ApplicationResource::new(Arc::clone(&state) as _, &config, Clock::new_tokio())?);

    for n in 1..=3 {
        state.upsert_container(ContainerInformation::new(format!("container_{n:02}"), "worker", 1));

        let readers: Vec<_> = (0..5)
            .map(|_| {
                let resource = Arc::clone(&resource);
                tokio::spawn(async move { resource.get_json("/live/components").await })
            })
            .collect();

        for reader in readers {
            let components = reader.await??;
            println!("round {n}: {}", components["worker"]["containers"]);
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
    }

    let missing = resource.get_json("/live/containers/container_42").await.unwrap_err();
    println!("{missing} -> {}", missing.status());
    println!("state was read {} time(s)", state.reads());
    Ok(())
}
