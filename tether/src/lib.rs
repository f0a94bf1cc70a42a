//! # tether - Lifecycle-Persistent Async Results
//!
//! `tether` keeps the result of asynchronous work alive across the lifecycle
//! of the consumer that asked for it. Work runs in a [`Slot`] owned by a
//! long-lived [`HostContainer`]; a consumer that is torn down and recreated
//! subscribes again under the same id and receives the cached outcome
//! instead of starting the work over.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tether::prelude::*;
//!
//! let delivery = Arc::new(LoopExecutor::spawn()?);
//! let host: SharedHost = Arc::new(SlotMap::new(delivery));
//!
//! // Every incarnation of the consumer builds the same handle...
//! let profile = LoadAsync::from_provider(host.clone(), PROFILE, || {
//!     Task::new(|_| fetch_profile()).boxed()
//! });
//! // ...and only the first one runs `fetch_profile`.
//! profile.subscribe(Arc::new(FnObserver::new(show, report)))?;
//! ```

#![deny(clippy::pub_use, clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use tether_core::{
    // Results
    AsyncError,
    AsyncResult,
    AsyncResultExt,
    BoxAsync,
    // Error types
    BoxError,
    // Cancellation
    CancelToken,
    Completion,
    ContractError,
    // Delivery thread
    Executor,
    // Observer
    FnObserver,
    Job,
    Observer,
    Outcome,
    // Payload
    Payload,
    // Provider
    Provider,
    RegistryError,
    // Release
    Releaser,
    SharedAsync,
    SharedObserver,
    SharedProvider,
    SlotId,
    Subscription,
    TetherError,
    run_or_post,
};

// Slot engine
pub use tether_std::{
    context::DeliveryContext,
    host::{ErasedSlot, HostContainer, SharedHost, SlotMap},
    slot::{Freshness, Policy, Slot, SlotState},
};

// Load / Send
pub use tether_std::{load::LoadAsync, send::SendAsync};

// Executions
pub use tether_std::{
    future::{FutureTask, Spawner},
    task::{InlineWorker, Ready, Task, ThreadWorker, Worker},
};

// Context registry
pub use tether_std::registry::{ContextRegistry, RegistryBuilder};

#[cfg(feature = "inventory")]
pub use tether_std::registry::Registration;

/// Delivery thread implementations.
pub mod executor {
    pub use tether_std::executor::{LoopExecutor, LoopExecutorBuilder, ManualExecutor};
}

/// Standard observer decorators.
pub mod observers {
    #![allow(clippy::wildcard_imports)]
    pub use tether_std::observers::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use tether_std::testing::*;
}

/// Prelude module - common imports for Tether.
///
/// # Usage
///
/// ```rust,ignore
/// use tether::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Results
        AsyncError,
        AsyncResult,
        AsyncResultExt,
        BoxAsync,
        // Errors
        BoxError,
        ContractError,
        // Slots
        DeliveryContext,
        FnObserver,
        Freshness,
        HostContainer,
        LoadAsync,
        Observer,
        Outcome,
        Policy,
        Provider,
        Ready,
        SendAsync,
        SharedHost,
        SlotMap,
        Task,
        executor::{LoopExecutor, ManualExecutor},
    };
    pub use std::sync::Arc;
}

#[cfg(feature = "inventory")]
pub use inventory;
