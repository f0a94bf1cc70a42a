//! Execution providers: factories of fresh handles.

use crate::async_result::BoxAsync;
use std::sync::Arc;

/// Produces a fresh [`AsyncResult`](crate::AsyncResult) each time it is called.
///
/// Calling `provide` must not start any work; only subscribing the returned
/// handle does. Two calls never share in-flight work.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Provider<{D}>`",
    label = "missing `Provider` implementation",
    note = "Closures `Fn() -> BoxAsync<{D}>` implement `Provider` automatically."
)]
pub trait Provider<D>: Send + Sync + 'static {
    /// Create a new, unsubscribed handle.
    fn provide(&self) -> BoxAsync<D>;
}

impl<D, F> Provider<D> for F
where
    F: Fn() -> BoxAsync<D> + Send + Sync + 'static,
{
    fn provide(&self) -> BoxAsync<D> {
        (self)()
    }
}

/// A shared, type-erased provider.
pub type SharedProvider<D> = Arc<dyn Provider<D>>;
