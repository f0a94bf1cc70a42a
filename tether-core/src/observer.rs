//! # Observer
//!
//! The receiving end of an [`AsyncResult`](crate::AsyncResult).
//!
//! Observers are called on the delivery thread. A value is handed over as an
//! `Arc<D>` because a slot keeps its own reference for replay; observers must
//! not assume they hold the only one.

use crate::error::AsyncError;
use std::{marker::PhantomData, sync::Arc};

/// Receives the outcome of a unit of work.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `Observer<{D}>`",
    label = "missing `Observer` implementation",
    note = "Observers must implement `on_result` and `on_error` for `{D}`."
)]
pub trait Observer<D>: Send + Sync + 'static {
    /// The unit of work produced a value.
    fn on_result(&self, data: Arc<D>);

    /// The unit of work failed.
    fn on_error(&self, error: AsyncError);

    /// The slot feeding this observer was torn down while it was attached.
    ///
    /// Any value previously delivered has been released and must not be used.
    fn on_reset(&self) {}
}

impl<D, O: Observer<D> + ?Sized> Observer<D> for Arc<O> {
    fn on_result(&self, data: Arc<D>) {
        (**self).on_result(data)
    }

    fn on_error(&self, error: AsyncError) {
        (**self).on_error(error)
    }

    fn on_reset(&self) {
        (**self).on_reset()
    }
}

/// A shared, type-erased observer.
pub type SharedObserver<D> = Arc<dyn Observer<D>>;

/// An observer built from two closures.
pub struct FnObserver<D, R, E> {
    on_result: R,
    on_error: E,
    _phantom: PhantomData<fn(D)>,
}

impl<D, R, E> FnObserver<D, R, E>
where
    R: Fn(Arc<D>) + Send + Sync + 'static,
    E: Fn(AsyncError) + Send + Sync + 'static,
{
    /// Create an observer from a result callback and an error callback.
    pub fn new(on_result: R, on_error: E) -> Self {
        Self {
            on_result,
            on_error,
            _phantom: PhantomData,
        }
    }
}

impl<D, R, E> Observer<D> for FnObserver<D, R, E>
where
    D: 'static,
    R: Fn(Arc<D>) + Send + Sync + 'static,
    E: Fn(AsyncError) + Send + Sync + 'static,
{
    fn on_result(&self, data: Arc<D>) {
        (self.on_result)(data)
    }

    fn on_error(&self, error: AsyncError) {
        (self.on_error)(error)
    }
}
