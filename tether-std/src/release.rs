//! # Cancellation & Release
//!
//! Values owned by a slot are handed to the release hook exactly once: when a
//! newer outcome replaces them, when the slot is torn down, or when they
//! arrive for a slot that no longer wants them. A value that is the very same
//! allocation as its replacement is kept.
//!
//! Release hooks run outside any slot lock. A failing or panicking hook is
//! logged and the slot transition that triggered it still completes.

use crate::context::DeliveryContext;
use std::panic::{self, AssertUnwindSafe};
use tether_core::{Outcome, Payload, Releaser, SharedAsync};

/// Invoke a release hook, containing errors and panics.
pub(crate) fn run_hook<D: 'static>(releaser: &dyn Releaser<D>, data: &D) {
    match panic::catch_unwind(AssertUnwindSafe(|| releaser.release(data))) {
        Ok(Ok(())) => {}
        Ok(Err(_err)) => {
            log_warn!(error = %_err, "release hook failed");
        }
        Err(_) => {
            log_warn!("release hook panicked");
        }
    }
}

/// Release a superseded outcome unless it shares its value with `replacement`.
pub(crate) fn retire<D: Payload>(
    context: &DeliveryContext<D>,
    old: Outcome<D>,
    replacement: &Outcome<D>,
) {
    if old.same_value(replacement) {
        return;
    }
    discard(context, old);
}

/// Release an outcome nobody will hold any more.
pub(crate) fn discard<D: Payload>(context: &DeliveryContext<D>, outcome: Outcome<D>) {
    if let Outcome::Data(data) = outcome {
        context.release(&data);
    }
}

/// Cancel an execution that was taken out of its slot.
///
/// Cooperative: the observer attached to the handle is silenced, the work
/// itself may still finish.
pub(crate) fn cancel_execution<D: 'static>(execution: Option<SharedAsync<D>>) {
    if let Some(handle) = execution {
        handle.cancel();
    }
}
