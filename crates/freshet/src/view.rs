// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The contract between a cache entry and the computation that feeds it.

use std::{fmt::Debug, sync::Arc};

use futures::future::BoxFuture;

use crate::BoxError;

/// A named, typed computation that produces a fresh value from an external source.
///
/// A view holds no cached state of its own. It is owned by exactly one
/// [`CachedView`](crate::CachedView), which decides when `refresh` runs and
/// guarantees that at most one call is in flight at any time.
///
/// Implementations should only read from their source; the entry assumes a
/// refresh has no side effects beyond producing its value.
///
/// # Examples
///
/// ```
/// use freshet::{BoxError, RefreshableView};
///
/// struct ReplicaCount;
///
/// impl RefreshableView for ReplicaCount {
///     type Value = usize;
///
///     async fn refresh(&self) -> Result<usize, BoxError> {
///         Ok(3)
///     }
/// }
/// ```
pub trait RefreshableView: Send + Sync + 'static {
    /// The type of value this view produces.
    type Value: Send + Sync + 'static;

    /// Computes a fresh value, or fails.
    fn refresh(&self) -> impl Future<Output = Result<Self::Value, BoxError>> + Send;
}

/// A [`RefreshableView`] backed by a closure. Created by [`from_fn`].
#[derive(Clone)]
pub struct FnView<F> {
    func: F,
}

impl<F> Debug for FnView<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnView").finish_non_exhaustive()
    }
}

/// Creates a view that calls `func` on every refresh.
///
/// # Examples
///
/// ```
/// use freshet::{BoxError, from_fn};
///
/// let view = from_fn(|| async { Ok::<_, BoxError>(vec!["container_01".to_string()]) });
/// # let _ = view;
/// ```
pub fn from_fn<F, Fut, T>(func: F) -> FnView<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BoxError>> + Send,
    T: Send + Sync + 'static,
{
    FnView { func }
}

impl<F, Fut, T> RefreshableView for FnView<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BoxError>> + Send,
    T: Send + Sync + 'static,
{
    type Value = T;

    fn refresh(&self) -> impl Future<Output = Result<T, BoxError>> + Send {
        (self.func)()
    }
}

pub(crate) type RefreshFuture<T> = BoxFuture<'static, Result<T, BoxError>>;

/// Object-safe form of [`RefreshableView`] so entries can be stored by value type alone.
pub(crate) trait DynView<T>: Send + Sync {
    fn refresh_boxed(self: Arc<Self>) -> RefreshFuture<T>;
}

impl<V: RefreshableView> DynView<V::Value> for V {
    fn refresh_boxed(self: Arc<Self>) -> RefreshFuture<V::Value> {
        Box::pin(async move { self.refresh().await })
    }
}
