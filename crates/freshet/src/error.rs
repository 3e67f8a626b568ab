// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for view lookups and refreshes.

use std::{error::Error as StdError, sync::Arc};

use crate::ViewKey;

/// A boxed error returned by [`RefreshableView::refresh`](crate::RefreshableView::refresh).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The result for fallible operations that use the [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// An error from a registry lookup or a view refresh.
///
/// Errors are cheap to clone: the outcome of one refresh attempt is handed to
/// the caller that started it and to every caller that joined it.
///
/// Use [`Error::kind`] to find out what went wrong and
/// [`Error::is_precondition`] to tell caller defects apart from data errors.
///
/// # Examples
///
/// ```
/// use freshet::{Error, ErrorKind};
///
/// let error = Error::unregistered_key("live/nodes");
///
/// assert!(error.is_precondition());
/// assert!(matches!(error.kind(), ErrorKind::UnregisteredKey(_)));
/// assert_eq!(error.to_string(), "no view is registered under key `live/nodes`");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error(transparent)]
pub struct Error(#[from] ErrorKind);

/// The reason behind an [`Error`].
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The key was never registered. The caller is defective.
    #[error("no view is registered under key `{0}`")]
    UnregisteredKey(ViewKey),

    /// The key is registered, but holds values of a different type.
    #[error("view `{key}` does not hold values of type `{requested}`")]
    TypeMismatch {
        /// The key that was looked up.
        key: ViewKey,
        /// The value type the caller asked for.
        requested: &'static str,
    },

    /// The key was registered twice while building a registry.
    #[error("a view is already registered under key `{0}`")]
    DuplicateKey(ViewKey),

    /// The view failed to produce a fresh value.
    #[error("failed to refresh view `{key}`")]
    Refresh {
        /// The key of the view that failed.
        key: ViewKey,
        /// The failure reported by the view.
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },
}

impl Error {
    /// Creates an error for a lookup of a key that was never registered.
    pub fn unregistered_key(key: impl Into<ViewKey>) -> Self {
        Self(ErrorKind::UnregisteredKey(key.into()))
    }

    pub(crate) fn type_mismatch(key: impl Into<ViewKey>, requested: &'static str) -> Self {
        Self(ErrorKind::TypeMismatch {
            key: key.into(),
            requested,
        })
    }

    pub(crate) fn duplicate_key(key: impl Into<ViewKey>) -> Self {
        Self(ErrorKind::DuplicateKey(key.into()))
    }

    /// Creates an error for a failed refresh of the view under `key`.
    pub fn refresh(key: impl Into<ViewKey>, source: impl Into<BoxError>) -> Self {
        let source: BoxError = source.into();
        Self(ErrorKind::Refresh {
            key: key.into(),
            source: Arc::from(source),
        })
    }

    /// Returns the reason behind this error.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Returns `true` if the error signals a defect in the caller rather than
    /// a transient or data-level condition.
    ///
    /// Precondition errors are never worth retrying.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.0,
            ErrorKind::UnregisteredKey(_) | ErrorKind::TypeMismatch { .. } | ErrorKind::DuplicateKey(_)
        )
    }

    /// Returns `true` if the error comes from a failed refresh.
    #[must_use]
    pub fn is_refresh(&self) -> bool {
        matches!(self.0, ErrorKind::Refresh { .. })
    }
}
