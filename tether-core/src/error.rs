//! Error types for Tether.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`TetherError`] - Top-level error type for all Tether operations
//! - [`ContractError`] - Misuse of the API surface (caller defects)
//! - [`RegistryError`] - Errors from context registration and lookup
//! - [`AsyncError`] - A failed unit of work, carried as data

use std::{fmt, sync::Arc};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identifier of a slot inside a host container.
pub type SlotId = u32;

/// Top-level error type for all Tether operations.
#[derive(Error, Debug)]
pub enum TetherError {
    /// The API surface was used in a way its contract forbids.
    #[error("contract violation: {0}")]
    Contract(#[from] ContractError),

    /// A context registry lookup or registration failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Programmer errors on the API surface.
///
/// These signal defects in calling code and are never delivered through an
/// observer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// A handle already has an observer attached.
    #[error("an observer is already subscribed to this handle")]
    AlreadySubscribed,

    /// A delegated context was asked to provide before a provider was set.
    #[error("delegated context has no provider armed")]
    ProviderNotArmed,

    /// `set_provider` was called on a direct context.
    #[error("direct contexts cannot be re-armed")]
    NotDelegated,

    /// An operation that needs an observer ran before `subscribe`.
    #[error("no observer subscribed")]
    NotSubscribed,

    /// The slot stored under this id holds another payload type or policy.
    #[error("slot {id} holds a different payload type or policy than requested ({expected})")]
    SlotMismatch {
        /// The slot id that was looked up.
        id: SlotId,
        /// The payload type the caller asked for.
        expected: &'static str,
    },

    /// The slot was already torn down.
    #[error("slot {0} has been torn down")]
    TornDown(SlotId),
}

/// Errors that can occur in the context registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No factory is registered for the request type.
    #[error("no context registered for request type: {0}")]
    NotRegistered(&'static str),

    /// A factory is already registered for the request type.
    #[error("context already registered for request type: {0}")]
    Duplicate(&'static str),
}

impl From<BoxError> for TetherError {
    fn from(err: BoxError) -> Self {
        TetherError::Custom(err)
    }
}

/// The error half of an [`Outcome`](crate::Outcome).
///
/// Failures of a unit of work are data once they reach a slot: they are cached
/// and replayed like values, so the error is shared behind an `Arc`.
#[derive(Clone)]
pub struct AsyncError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl AsyncError {
    /// Wrap an error.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Build an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::from(BoxError::from(message.into()))
    }

    /// The error reported when a handle is cancelled before completing.
    pub fn cancelled() -> Self {
        Self::msg("execution was cancelled")
    }

    /// Access the wrapped error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl From<BoxError> for AsyncError {
    fn from(err: BoxError) -> Self {
        Self(Arc::from(err))
    }
}

impl fmt::Debug for AsyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AsyncError").field(&self.0).finish()
    }
}

impl fmt::Display for AsyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AsyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Two errors are equal when they share an allocation or render the same message.
impl PartialEq for AsyncError {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.to_string() == other.0.to_string()
    }
}

impl Eq for AsyncError {}
