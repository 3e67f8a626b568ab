// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The self-refreshing cache entry.

use std::{
    fmt::Debug,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use futures::{
    FutureExt as _,
    future::{BoxFuture, Shared},
};
use parking_lot::{Mutex, RwLock};
use tick::{Clock, FutureExt as _};

use crate::{
    Error, RefreshableView, Result, ViewKey,
    telemetry::{self, ViewActivity},
    view::DynView,
};

/// The staleness window used when none is configured.
pub const DEFAULT_STALENESS: Duration = Duration::from_millis(1000);

/// What a caller does when it finds a refresh of the same entry already in flight.
///
/// The caller that starts a refresh always waits for it. The policy only
/// applies to callers that join an in-flight refresh, and only while the
/// entry holds a previous value; without one, every caller waits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Wait for the in-flight refresh and return its outcome, including failures.
    #[default]
    Wait,

    /// Return the stored, stale value immediately.
    ServeStale,

    /// Wait up to the given duration, then return the stored, stale value.
    WaitAtMost(Duration),
}

/// Staleness window and wait policy of an entry.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use freshet::{ViewOptions, WaitPolicy};
///
/// let options = ViewOptions::new(Duration::from_millis(250)).wait_policy(WaitPolicy::ServeStale);
///
/// assert_eq!(options.staleness(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    staleness: Duration,
    wait: WaitPolicy,
}

impl ViewOptions {
    /// Creates options with the given staleness window and [`WaitPolicy::Wait`].
    #[must_use]
    pub const fn new(staleness: Duration) -> Self {
        Self {
            staleness,
            wait: WaitPolicy::Wait,
        }
    }

    /// Sets the policy for callers that join an in-flight refresh.
    #[must_use]
    pub const fn wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Returns the staleness window.
    #[must_use]
    pub const fn staleness(&self) -> Duration {
        self.staleness
    }

    /// Returns the wait policy.
    #[must_use]
    pub const fn wait(&self) -> WaitPolicy {
        self.wait
    }
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self::new(DEFAULT_STALENESS)
    }
}

/// A value together with the instant it was computed.
///
/// The two are always published and read as one unit.
#[derive(Debug)]
pub struct Snapshot<T> {
    value: Arc<T>,
    refreshed_at: Instant,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            refreshed_at: self.refreshed_at,
        }
    }
}

impl<T> Snapshot<T> {
    /// Returns the stored value.
    #[must_use]
    pub fn value(&self) -> &Arc<T> {
        &self.value
    }

    /// Returns the instant the value was computed at.
    #[must_use]
    pub fn refreshed_at(&self) -> Instant {
        self.refreshed_at
    }

    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.refreshed_at)
    }
}

type Outcome<T> = Result<Arc<T>>;
type Flight<T> = Shared<BoxFuture<'static, Outcome<T>>>;

struct Inner<T> {
    key: ViewKey,
    view: Arc<dyn DynView<T>>,
    clock: Clock,
    options: ViewOptions,
    snapshot: RwLock<Option<Snapshot<T>>>,
    in_flight: Mutex<Option<Flight<T>>>,
    refreshes: AtomicU64,
}

enum Join<T> {
    Fresh(Arc<T>),
    Leader(Flight<T>),
    Follower(Flight<T>),
}

/// A view wrapped with a staleness window and its last computed value.
///
/// [`get`](Self::get) returns the stored value while it is younger than the
/// staleness window. Once it is stale, the next caller starts a refresh and
/// callers arriving meanwhile join that refresh instead of starting their
/// own, so the view is never called more than once at a time.
///
/// A failed refresh leaves the stored value and its timestamp untouched and
/// is reported to every caller that started or joined it. There is no
/// automatic retry: the next `get` after the failure starts a new attempt.
///
/// Cloning a `CachedView` is cheap and yields a handle to the same entry.
/// An abandoned refresh that no later caller resumes keeps the entry alive
/// after its last handle is dropped.
///
/// # Examples
///
/// ```
/// use freshet::{BoxError, CachedView, ViewOptions, from_fn};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let clock = Clock::new_frozen();
/// let entry = CachedView::new(
///     "live/components",
///     from_fn(|| async { Ok::<_, BoxError>(vec!["worker", "master"]) }),
///     clock,
///     ViewOptions::default(),
/// );
///
/// let components = entry.get().await?;
/// assert_eq!(components.len(), 2);
/// assert_eq!(entry.refresh_count(), 1);
/// # Ok::<(), freshet::Error>(())
/// # });
/// ```
pub struct CachedView<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for CachedView<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for CachedView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedView")
            .field("key", &self.inner.key)
            .field("options", &self.inner.options)
            .field("refreshes", &self.inner.refreshes.load(Ordering::Relaxed))
            .field("has_value", &self.inner.snapshot.read().is_some())
            .finish_non_exhaustive()
    }
}

impl<T> CachedView<T>
where
    T: Send + Sync + 'static,
{
    /// Creates an empty entry. The view is first called by the first [`get`](Self::get).
    pub fn new<V>(key: impl Into<ViewKey>, view: V, clock: Clock, options: ViewOptions) -> Self
    where
        V: RefreshableView<Value = T>,
    {
        Self {
            inner: Arc::new(Inner {
                key: key.into(),
                view: Arc::new(view),
                clock,
                options,
                snapshot: RwLock::new(None),
                in_flight: Mutex::new(None),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    /// Returns a value no older than the staleness window, refreshing it first if needed.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Refresh`](crate::ErrorKind::Refresh) error if the
    /// refresh this call started or joined fails. The stored value is kept for
    /// later calls.
    pub async fn get(&self) -> Result<Arc<T>> {
        let stale = match self.inner.fresh_or_stale(self.inner.clock.instant()) {
            Ok(value) => {
                telemetry::record(&self.inner.key, ViewActivity::Hit, None);
                return Ok(value);
            }
            Err(stale) => stale,
        };

        match self.join_or_start() {
            Join::Fresh(value) => {
                telemetry::record(&self.inner.key, ViewActivity::Hit, None);
                Ok(value)
            }
            Join::Leader(flight) => flight.await,
            Join::Follower(flight) => {
                telemetry::record(&self.inner.key, ViewActivity::RefreshJoined, None);
                self.follow(flight, stale).await
            }
        }
    }

    /// Returns the stored value and its timestamp without refreshing.
    #[must_use]
    pub fn peek(&self) -> Option<Snapshot<T>> {
        self.inner.snapshot.read().clone()
    }

    /// Returns the number of refreshes started so far, failed ones included.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.load(Ordering::Relaxed)
    }

    /// Returns the key this entry is registered under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Returns the staleness window.
    #[must_use]
    pub fn staleness(&self) -> Duration {
        self.inner.options.staleness()
    }

    /// Returns the wait policy for callers joining an in-flight refresh.
    #[must_use]
    pub fn wait_policy(&self) -> WaitPolicy {
        self.inner.options.wait()
    }

    fn join_or_start(&self) -> Join<T> {
        let mut in_flight = self.inner.in_flight.lock();

        if let Some(flight) = in_flight.as_ref() {
            return Join::Follower(flight.clone());
        }

        // A refresh may have completed between the staleness check and taking the lock.
        if let Ok(value) = self.inner.fresh_or_stale(self.inner.clock.instant()) {
            return Join::Fresh(value);
        }

        self.inner.refreshes.fetch_add(1, Ordering::Relaxed);
        telemetry::record(&self.inner.key, ViewActivity::RefreshStarted, None);

        let flight = Inner::refresh(Arc::clone(&self.inner)).shared();
        *in_flight = Some(flight.clone());
        Join::Leader(flight)
    }

    async fn follow(&self, flight: Flight<T>, stale: Option<Arc<T>>) -> Outcome<T> {
        let Some(stale) = stale else {
            return flight.await;
        };

        if let Some(outcome) = flight.peek() {
            return outcome.clone();
        }

        // Nobody else is polling the refresh: its leader was dropped, so this caller drives it.
        if is_orphaned(&flight) {
            return flight.await;
        }

        match self.inner.options.wait() {
            WaitPolicy::Wait => flight.await,
            WaitPolicy::ServeStale => {
                telemetry::record(&self.inner.key, ViewActivity::ServedStale, None);
                Ok(stale)
            }
            WaitPolicy::WaitAtMost(limit) => {
                if let Ok(outcome) = flight.timeout(&self.inner.clock, limit).await {
                    return outcome;
                }
                telemetry::record(&self.inner.key, ViewActivity::ServedStale, Some(limit));
                Ok(stale)
            }
        }
    }
}

impl<T> Inner<T>
where
    T: Send + Sync + 'static,
{
    /// Returns the stored value if it is fresh, or the stale value (if any) otherwise.
    fn fresh_or_stale(&self, now: Instant) -> std::result::Result<Arc<T>, Option<Arc<T>>> {
        match self.snapshot.read().as_ref() {
            Some(snapshot) if snapshot.age(now) < self.options.staleness() => Ok(Arc::clone(&snapshot.value)),
            Some(snapshot) => Err(Some(Arc::clone(&snapshot.value))),
            None => Err(None),
        }
    }

    fn refresh(this: Arc<Self>) -> BoxFuture<'static, Outcome<T>> {
        Box::pin(async move {
            let started = this.clock.instant();
            let result = AssertUnwindSafe(Arc::clone(&this.view).refresh_boxed()).catch_unwind().await;
            let now = this.clock.instant();
            let elapsed = Some(now.saturating_duration_since(started));

            let outcome = match result {
                Ok(Ok(value)) => {
                    let value = Arc::new(value);
                    *this.snapshot.write() = Some(Snapshot {
                        value: Arc::clone(&value),
                        refreshed_at: now,
                    });
                    telemetry::record(&this.key, ViewActivity::Refreshed, elapsed);
                    Ok(value)
                }
                Ok(Err(source)) => {
                    telemetry::record(&this.key, ViewActivity::RefreshFailed, elapsed);
                    Err(Error::refresh(this.key.clone(), source))
                }
                Err(_panic) => {
                    telemetry::record(&this.key, ViewActivity::RefreshFailed, elapsed);
                    Err(Error::refresh(this.key.clone(), "view panicked during refresh"))
                }
            };

            // Published before the slot is cleared, so a caller that finds the slot empty
            // also finds the new snapshot.
            this.in_flight.lock().take();
            outcome
        })
    }
}

/// The slot in the entry plus the caller's own handle are the only references left.
fn is_orphaned<T>(flight: &Flight<T>) -> bool {
    flight.strong_count().is_some_and(|count| count <= 2)
}
