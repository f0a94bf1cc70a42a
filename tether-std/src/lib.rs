//! # tether-std
//!
//! Standard implementations for the Tether persistent async result framework.
//!
//! This crate provides:
//! - **Delivery contexts**: [`DeliveryContext`], direct or delegated
//! - **Delivery threads**: [`ManualExecutor`], [`LoopExecutor`]
//! - **Host containers**: [`HostContainer`], [`SlotMap`]
//! - **Slot engine**: [`Slot`] with [`Policy`] and [`Freshness`]
//! - **Load/Send**: [`LoadAsync`], [`SendAsync`]
//! - **Executions**: [`Ready`], [`Task`], [`FutureTask`]
//! - **Context registry**: [`ContextRegistry`]

#![deny(clippy::pub_use, clippy::wildcard_imports)]
#![warn(missing_docs)]

#[macro_use]
mod log;

// Re-export core traits
pub use tether_core;

// Modules
pub mod context;
pub mod executor;
pub mod future;
pub mod host;
pub mod load;
pub mod observers;
pub mod registry;
mod release;
pub mod send;
pub mod slot;
pub mod task;
pub mod testing;

pub use context::DeliveryContext;
pub use executor::{LoopExecutor, LoopExecutorBuilder, ManualExecutor};
pub use future::{FutureTask, Spawner};
pub use host::{ErasedSlot, HostContainer, SharedHost, SlotMap};
pub use load::LoadAsync;
pub use registry::{ContextRegistry, RegistryBuilder};
#[cfg(feature = "inventory")]
pub use registry::Registration;
pub use send::SendAsync;
pub use slot::{Freshness, Policy, Slot, SlotState};
pub use task::{InlineWorker, Ready, Task, ThreadWorker, Worker};

#[cfg(feature = "inventory")]
pub use inventory;
