//! Payload trait for values produced by units of work.

/// A marker trait for values that travel through Tether.
///
/// Payloads cross from worker threads to the delivery thread and may be
/// replayed to later observers, so they must be `Send + Sync + 'static`.
///
/// Every type meeting those bounds is a payload.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Payload",
    label = "must be `Send + Sync + 'static`",
    note = "Values delivered through Tether must be thread-safe and static."
)]
pub trait Payload: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Payload for T {}
