// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Self-refreshing named views with bounded staleness.
//!
//! This crate sits between a read-heavy query interface and an authoritative
//! state source. It keeps the last value of each named view and recomputes it
//! only once the value is older than a staleness window:
//!
//! - [`RefreshableView`] - the computation that produces a fresh value
//! - [`CachedView`] - one view plus its staleness window and last value, with
//!   single-flight refresh: concurrent callers of a stale entry share one
//!   refresh instead of each calling the view
//! - [`ViewRegistry`] - a fixed, key-checked map of entries with heterogeneous
//!   value types, built once at startup
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use freshet::{BoxError, ViewRegistry, from_fn};
//! use tick::ClockControl;
//! # futures::executor::block_on(async {
//!
//! let control = ClockControl::new();
//! let registry = ViewRegistry::builder(control.to_clock())
//!     .staleness(Duration::from_millis(1000))
//!     .register("live/resources", from_fn(|| async { Ok::<_, BoxError>(12_u32) }))?
//!     .build();
//!
//! // First access computes the value.
//! assert_eq!(*registry.lookup::<u32>("live/resources").await?, 12);
//!
//! // Within the window the stored value is served.
//! control.advance(Duration::from_millis(500));
//! registry.lookup::<u32>("live/resources").await?;
//!
//! let entry = registry.entry::<u32>("live/resources")?;
//! assert_eq!(entry.refresh_count(), 1);
//! # Ok::<(), freshet::Error>(())
//! # });
//! ```
//!
//! # Concurrency
//!
//! Each entry guards its stored value and its in-flight refresh with its own
//! locks; there is no registry-wide lock. Callers that arrive while a refresh
//! is in flight wait for it by default, see [`WaitPolicy`] for alternatives.
//!
//! # Features
//!
//! - **`logs`** (default) - emits `tracing` events for hits, refreshes and failures.

use std::borrow::Cow;

mod entry;
mod error;
mod registry;
mod telemetry;
mod view;

/// Identifies one named view, for example `"live/resources"`.
pub type ViewKey = Cow<'static, str>;

#[doc(inline)]
pub use entry::{CachedView, DEFAULT_STALENESS, Snapshot, ViewOptions, WaitPolicy};
#[doc(inline)]
pub use error::{BoxError, Error, ErrorKind, Result};
#[doc(inline)]
pub use registry::{ViewRegistry, ViewRegistryBuilder};
#[doc(inline)]
pub use view::{FnView, RefreshableView, from_fn};
