//! Delivery thread implementations.
//!
//! - [`ManualExecutor`]: the thread that creates it is the delivery thread;
//!   jobs posted from other threads wait until [`ManualExecutor::run_pending`].
//!   Deterministic, so tests drive it by hand.
//! - [`LoopExecutor`]: a dedicated thread draining a channel.

pub mod looper;
pub mod manual;

pub use looper::{LoopExecutor, LoopExecutorBuilder};
pub use manual::ManualExecutor;
