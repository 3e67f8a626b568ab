// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resource paths below the application root.
//!
//! The keys of the cached views are the paths they are served under.

/// The desired model.
pub const MODEL_DESIRED: &str = "model/desired";
/// The resolved model.
pub const MODEL_RESOLVED: &str = "model/resolved";
/// Application configuration of the desired model.
pub const MODEL_DESIRED_APPCONF: &str = "model/desired/appconf";
/// Resources of the desired model.
pub const MODEL_DESIRED_RESOURCES: &str = "model/desired/resources";
/// Application configuration of the resolved model.
pub const MODEL_RESOLVED_APPCONF: &str = "model/resolved/appconf";
/// Resources of the resolved model.
pub const MODEL_RESOLVED_RESOURCES: &str = "model/resolved/resources";
/// Resources in use.
pub const LIVE_RESOURCES: &str = "live/resources";
/// Owned containers.
pub const LIVE_CONTAINERS: &str = "live/containers";
/// Components and their containers.
pub const LIVE_COMPONENTS: &str = "live/components";

/// Every path served from a cached view.
pub const VIEW_KEYS: [&str; 9] = [
    MODEL_DESIRED,
    MODEL_RESOLVED,
    MODEL_DESIRED_APPCONF,
    MODEL_DESIRED_RESOURCES,
    MODEL_RESOLVED_APPCONF,
    MODEL_RESOLVED_RESOURCES,
    LIVE_RESOURCES,
    LIVE_CONTAINERS,
    LIVE_COMPONENTS,
];

/// Listing of the application root.
pub const ROOT_ENTRIES: [&str; 3] = ["model", "live", "actions"];

/// Listing of `model`.
pub const MODEL_ENTRIES: [&str; 2] = ["desired", "resolved"];

/// Listing of `live`.
pub const LIVE_ENTRIES: [&str; 6] = ["resources", "containers", "components", "nodes", "statistics", "internal"];
