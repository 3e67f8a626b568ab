// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration of the cached views.

use std::time::Duration;

use freshet::{DEFAULT_STALENESS, ViewOptions, WaitPolicy};
use serde::{Deserialize, Serialize};

/// How callers behave when they find a refresh already in flight.
///
/// Serialized as `{"mode": "wait"}`, `{"mode": "serve_stale"}` or
/// `{"mode": "wait_at_most", "timeout_ms": 200}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WaitConfig {
    /// Wait for the refresh.
    #[default]
    Wait,
    /// Return the stale value immediately.
    ServeStale,
    /// Wait up to `timeout_ms`, then return the stale value.
    WaitAtMost {
        /// Longest wait in milliseconds.
        timeout_ms: u64,
    },
}

impl From<WaitConfig> for WaitPolicy {
    fn from(config: WaitConfig) -> Self {
        match config {
            WaitConfig::Wait => Self::Wait,
            WaitConfig::ServeStale => Self::ServeStale,
            WaitConfig::WaitAtMost { timeout_ms } => Self::WaitAtMost(Duration::from_millis(timeout_ms)),
        }
    }
}

/// Settings shared by every view of an [`ApplicationResource`](crate::ApplicationResource).
///
/// Missing fields take their defaults: a 1000 ms staleness window and
/// [`WaitConfig::Wait`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use freshet_appstate::ViewConfig;
///
/// let config = ViewConfig::from_json(r#"{ "staleness_ms": 250 }"#)?;
///
/// assert_eq!(config.options().staleness(), Duration::from_millis(250));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    /// Longest time a value is served without being recomputed, in milliseconds.
    pub staleness_ms: u64,
    /// Behavior of callers that find a refresh in flight.
    pub wait: WaitConfig,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            staleness_ms: u64::try_from(DEFAULT_STALENESS.as_millis()).unwrap_or(u64::MAX),
            wait: WaitConfig::Wait,
        }
    }
}

impl ViewConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is malformed or has unknown fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns the staleness window.
    #[must_use]
    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.staleness_ms)
    }

    /// Returns the entry options these settings describe.
    #[must_use]
    pub fn options(&self) -> ViewOptions {
        ViewOptions::new(self.staleness()).wait_policy(self.wait.into())
    }
}
