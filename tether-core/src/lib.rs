//! # tether-core
//!
//! Core contracts for the Tether persistent async result framework.
//!
//! This crate has minimal dependencies and is meant to be imported by code
//! that produces or consumes results without needing the slot engine in
//! `tether-std`.
//!
//! # Vocabulary
//!
//! - [`AsyncResult`]: a handle to a unit of work, started lazily on
//!   `subscribe`, silenced by `cancel`.
//! - [`Observer`]: receives the value or error of a handle, on the delivery
//!   thread.
//! - [`Outcome`]: what a unit of work settled to, or `Pending`.
//! - [`Provider`]: a factory of fresh handles, so work can be deferred until
//!   a slot actually needs it.
//! - [`Releaser`]: frees resources held by a value once nobody caches it.
//! - [`Executor`]: the serialized delivery thread.
//!
//! # Error Types
//!
//! - [`TetherError`] - Top-level error type
//! - [`ContractError`] - Programmer errors on the API surface
//! - [`RegistryError`] - Context registry errors
//! - [`AsyncError`] - Failures of a unit of work, delivered as data

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod async_result;
mod cancel;
mod error;
mod executor;
mod observer;
mod outcome;
mod payload;
mod provider;
mod release;
mod subscription;

// Re-exports
pub use async_result::{AsyncResult, AsyncResultExt, BoxAsync, Completion, SharedAsync};
pub use cancel::CancelToken;
pub use error::{AsyncError, BoxError, ContractError, RegistryError, SlotId, TetherError};
pub use executor::{Executor, Job, run_or_post};
pub use observer::{FnObserver, Observer, SharedObserver};
pub use outcome::Outcome;
pub use payload::Payload;
pub use provider::{Provider, SharedProvider};
pub use release::Releaser;
pub use subscription::Subscription;
