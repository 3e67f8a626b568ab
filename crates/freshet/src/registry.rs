// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A fixed set of named views, built once at startup.

use std::{
    any::{Any, type_name},
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::Duration,
};

use tick::Clock;

use crate::{
    CachedView, Error, RefreshableView, Result, ViewKey, ViewOptions, WaitPolicy,
    telemetry::{self, ViewActivity},
};

struct Registered {
    entry: Box<dyn Any + Send + Sync>,
    value_type: &'static str,
}

/// An immutable mapping from keys to [`CachedView`] entries.
///
/// Entries of one registry can hold values of different types. Each key is
/// bound to its type at registration time and [`lookup`](Self::lookup) checks
/// both that the key exists and that the caller asks for the right type.
/// Either mismatch is a defect in the caller and is reported as a
/// precondition error without touching any view.
///
/// The map itself is never modified after [`ViewRegistryBuilder::build`], so
/// lookups need no synchronization; every entry synchronizes on its own.
///
/// # Examples
///
/// ```
/// use freshet::{BoxError, ViewRegistry, from_fn};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let registry = ViewRegistry::builder(Clock::new_frozen())
///     .register("live/containers", from_fn(|| async { Ok::<_, BoxError>(4_usize) }))?
///     .register("model/desired", from_fn(|| async { Ok::<_, BoxError>("desired".to_string()) }))?
///     .build();
///
/// let containers = registry.lookup::<usize>("live/containers").await?;
/// assert_eq!(*containers, 4);
///
/// let error = registry.lookup::<usize>("live/nodes").await.unwrap_err();
/// assert!(error.is_precondition());
/// # Ok::<(), freshet::Error>(())
/// # });
/// ```
pub struct ViewRegistry {
    entries: HashMap<ViewKey, Registered>,
}

impl Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("ViewRegistry").field("keys", &keys).finish()
    }
}

impl ViewRegistry {
    /// Creates a builder whose entries read time from `clock`.
    #[must_use]
    pub fn builder(clock: Clock) -> ViewRegistryBuilder {
        ViewRegistryBuilder::new(clock)
    }

    /// Returns the current value of the view registered under `key`,
    /// refreshing it first if it is stale.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::UnregisteredKey`](crate::ErrorKind::UnregisteredKey) if
    ///   nothing is registered under `key`. No view is called.
    /// - [`ErrorKind::TypeMismatch`](crate::ErrorKind::TypeMismatch) if the
    ///   view under `key` does not produce `T`. No view is called.
    /// - Any error of [`CachedView::get`], unchanged.
    pub async fn lookup<T>(&self, key: &str) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.entry::<T>(key)?.get().await
    }

    /// Returns the entry registered under `key`.
    ///
    /// # Errors
    ///
    /// Fails like [`lookup`](Self::lookup) for unknown keys and wrong types.
    pub fn entry<T>(&self, key: &str) -> Result<&CachedView<T>>
    where
        T: Send + Sync + 'static,
    {
        let Some(registered) = self.entries.get(key) else {
            telemetry::record(key, ViewActivity::Unregistered, None);
            return Err(Error::unregistered_key(key.to_owned()));
        };

        registered
            .entry
            .downcast_ref::<CachedView<T>>()
            .ok_or_else(|| Error::type_mismatch(key.to_owned(), type_name::<T>()))
    }

    /// Returns `true` if a view is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the name of the value type bound to `key`.
    #[must_use]
    pub fn value_type(&self, key: &str) -> Option<&'static str> {
        self.entries.get(key).map(|registered| registered.value_type)
    }

    /// Returns the registered keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|key| &**key)
    }

    /// Returns the number of registered views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no views are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for a [`ViewRegistry`].
///
/// Views registered through [`register`](Self::register) share the builder's
/// clock and [`ViewOptions`] as they were when the view was registered.
#[derive(Debug)]
pub struct ViewRegistryBuilder {
    clock: Clock,
    options: ViewOptions,
    entries: HashMap<ViewKey, Registered>,
}

impl Debug for Registered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registered").field("value_type", &self.value_type).finish_non_exhaustive()
    }
}

impl ViewRegistryBuilder {
    fn new(clock: Clock) -> Self {
        Self {
            clock,
            options: ViewOptions::default(),
            entries: HashMap::new(),
        }
    }

    /// Sets the staleness window for views registered afterwards.
    #[must_use]
    pub fn staleness(mut self, staleness: Duration) -> Self {
        self.options = ViewOptions::new(staleness).wait_policy(self.options.wait());
        self
    }

    /// Sets the wait policy for views registered afterwards.
    #[must_use]
    pub fn wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.options = self.options.wait_policy(wait);
        self
    }

    /// Replaces the options for views registered afterwards.
    #[must_use]
    pub fn options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers `view` under `key` with the builder's current options.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DuplicateKey`](crate::ErrorKind::DuplicateKey) if
    /// `key` is already registered.
    pub fn register<V>(self, key: impl Into<ViewKey>, view: V) -> Result<Self>
    where
        V: RefreshableView,
    {
        let entry = CachedView::new(key, view, self.clock.clone(), self.options);
        self.register_entry(entry)
    }

    /// Registers a prebuilt entry under its own key and options.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DuplicateKey`](crate::ErrorKind::DuplicateKey) if
    /// the entry's key is already registered.
    pub fn register_entry<T>(mut self, entry: CachedView<T>) -> Result<Self>
    where
        T: Send + Sync + 'static,
    {
        let key = ViewKey::Owned(entry.key().to_owned());
        if self.entries.contains_key(&key) {
            return Err(Error::duplicate_key(key));
        }

        self.entries.insert(
            key,
            Registered {
                entry: Box::new(entry),
                value_type: type_name::<T>(),
            },
        );
        Ok(self)
    }

    /// Finishes the registry. No views can be added afterwards.
    #[must_use]
    pub fn build(self) -> ViewRegistry {
        ViewRegistry { entries: self.entries }
    }
}
