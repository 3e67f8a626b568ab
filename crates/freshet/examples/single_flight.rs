// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Demonstrates how a stale view is refreshed once for many concurrent readers.
//!
//! Ten tasks read the same view while it is stale. The first one starts the
//! refresh, the others join it, and the slow state source is queried once.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use freshet::{BoxError, ViewRegistry, from_fn};
use tick::Clock;

#[tokio::main]
async fn main() -> Result<(), freshet::Error> {
    let clock = Clock::new_tokio();
    let queries = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&queries);
    let registry = Arc::new(
        ViewRegistry::builder(clock)
            .staleness(Duration::from_millis(1000))
            .register(
                "live/containers",
                from_fn(move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                        println!("  querying the state source (query #{n})");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok::<_, BoxError>(vec![format!("container-{n}-a"), format!("container-{n}-b")])
                    }
                }),
            )?
            .build(),
    );

    for round in 1..=2 {
        println!("Round {round}: 10 concurrent readers");

        let handles: Vec<_> = (0..10)
            .map(|reader| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let containers = registry.lookup::<Vec<String>>("live/containers").await?;
                    println!("  [reader {reader}] {containers:?}");
                    Ok::<_, freshet::Error>(())
                })
            })
            .collect();

        for handle in handles {
            handle.await.expect("reader task panicked")?;
        }

        // Let the value go stale before the next round.
        tokio::time::sleep(Duration::from_millis(1100)).await;
    }

    println!("State source queried {} time(s) for 20 reads.", queries.load(Ordering::Relaxed));
    Ok(())
}
