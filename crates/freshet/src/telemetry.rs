// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events emitted by cache entries and the registry.
//!
//! With the `logs` feature enabled, every state change of an entry is
//! reported as a `tracing` event named `view.event`.

use std::time::Duration;

#[cfg(test)]
pub(crate) const VIEW_KEY_NAME: &str = "view.key";
#[cfg(test)]
pub(crate) const VIEW_ACTIVITY_NAME: &str = "view.activity";
#[cfg(test)]
pub(crate) const VIEW_DURATION_NAME: &str = "view.duration_ns";
#[cfg(test)]
pub(crate) const VIEW_EVENT_NAME: &str = "view.event";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ViewActivity {
    Hit,
    RefreshStarted,
    Refreshed,
    RefreshJoined,
    ServedStale,
    RefreshFailed,
    Unregistered,
}

#[cfg(any(feature = "logs", test))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(any(feature = "logs", test))]
impl ViewActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "view.hit",
            Self::RefreshStarted => "view.refresh_started",
            Self::Refreshed => "view.refreshed",
            Self::RefreshJoined => "view.refresh_joined",
            Self::ServedStale => "view.served_stale",
            Self::RefreshFailed => "view.refresh_failed",
            Self::Unregistered => "view.unregistered",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::RefreshStarted | Self::RefreshJoined => Severity::Debug,
            Self::Refreshed | Self::ServedStale => Severity::Info,
            Self::RefreshFailed => Severity::Warn,
            Self::Unregistered => Severity::Error,
        }
    }
}

#[cfg_attr(not(feature = "logs"), expect(unused_variables, reason = "no-op without the logs feature"))]
pub(crate) fn record(key: &str, activity: ViewActivity, duration: Option<Duration>) {
    #[cfg(feature = "logs")]
    {
        let act = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // Field names must match the constants above.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    view.key = key,
                    view.activity = act,
                    view.duration_ns = ?duration_ns,
                    "view.event"
                )
            };
        }

        match activity.severity() {
            Severity::Debug => emit_event!(debug),
            Severity::Info => emit_event!(info),
            Severity::Warn => emit_event!(warn),
            Severity::Error => emit_event!(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn activity_as_str() {
        assert_eq!(ViewActivity::Hit.as_str(), "view.hit");
        assert_eq!(ViewActivity::RefreshStarted.as_str(), "view.refresh_started");
        assert_eq!(ViewActivity::Refreshed.as_str(), "view.refreshed");
        assert_eq!(ViewActivity::RefreshJoined.as_str(), "view.refresh_joined");
        assert_eq!(ViewActivity::ServedStale.as_str(), "view.served_stale");
        assert_eq!(ViewActivity::RefreshFailed.as_str(), "view.refresh_failed");
        assert_eq!(ViewActivity::Unregistered.as_str(), "view.unregistered");
    }

    #[test]
    fn activity_severity() {
        assert_eq!(ViewActivity::Hit.severity(), Severity::Debug);
        assert_eq!(ViewActivity::RefreshJoined.severity(), Severity::Debug);
        assert_eq!(ViewActivity::Refreshed.severity(), Severity::Info);
        assert_eq!(ViewActivity::ServedStale.severity(), Severity::Info);
        assert_eq!(ViewActivity::RefreshFailed.severity(), Severity::Warn);
        assert_eq!(ViewActivity::Unregistered.severity(), Severity::Error);
    }

    #[cfg(feature = "logs")]
    #[traced_test]
    #[test]
    fn record_emits_all_fields() {
        record("live/containers", ViewActivity::RefreshFailed, Some(Duration::from_nanos(4242)));

        assert!(logs_contain(VIEW_EVENT_NAME));
        assert!(logs_contain(VIEW_KEY_NAME));
        assert!(logs_contain(VIEW_ACTIVITY_NAME));
        assert!(logs_contain(VIEW_DURATION_NAME));
        assert!(logs_contain("live/containers"));
        assert!(logs_contain("view.refresh_failed"));
        assert!(logs_contain("4242"));
        assert!(logs_contain("WARN"));
    }

    #[cfg(feature = "logs")]
    #[traced_test]
    #[test]
    fn record_uses_error_level_for_unregistered_keys() {
        record("nonexistent", ViewActivity::Unregistered, None);

        assert!(logs_contain("ERROR"));
        assert!(logs_contain("view.unregistered"));
    }
}
