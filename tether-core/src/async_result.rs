//! # AsyncResult
//!
//! A handle to a unit of work that may not have started yet.
//!
//! Work starts no earlier than `subscribe`. A handle admits exactly one
//! observer over its whole life; after `cancel` it is inert and the observer
//! that was attached never hears from it again.

use crate::{
    error::{AsyncError, ContractError},
    observer::{Observer, SharedObserver},
    payload::Payload,
};
use futures::channel::oneshot;
use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

/// A handle to a (possibly not-yet-started) unit of work.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `AsyncResult<{D}>`",
    label = "missing `AsyncResult` implementation",
    note = "Handles must implement `subscribe` and `cancel`."
)]
pub trait AsyncResult<D>: Send + Sync + 'static {
    /// Register the single observer of this handle.
    ///
    /// Returns [`ContractError::AlreadySubscribed`] if an observer was
    /// registered before. Subscribing a cancelled handle is accepted and inert.
    fn subscribe(&self, observer: SharedObserver<D>) -> Result<(), ContractError>;

    /// Drop interest in the outcome and request cancellation of the work.
    ///
    /// Idempotent. Cancellation is cooperative: the work may still run to
    /// completion, but the observer is not called afterwards.
    fn cancel(&self);
}

/// An owned, type-erased handle.
pub type BoxAsync<D> = Box<dyn AsyncResult<D>>;

/// A shared, type-erased handle.
pub type SharedAsync<D> = Arc<dyn AsyncResult<D>>;

impl<D, A: AsyncResult<D> + ?Sized> AsyncResult<D> for Box<A> {
    fn subscribe(&self, observer: SharedObserver<D>) -> Result<(), ContractError> {
        (**self).subscribe(observer)
    }

    fn cancel(&self) {
        (**self).cancel()
    }
}

impl<D, A: AsyncResult<D> + ?Sized> AsyncResult<D> for Arc<A> {
    fn subscribe(&self, observer: SharedObserver<D>) -> Result<(), ContractError> {
        (**self).subscribe(observer)
    }

    fn cancel(&self) {
        (**self).cancel()
    }
}

/// Extension methods for every [`AsyncResult`].
pub trait AsyncResultExt<D: Payload>: AsyncResult<D> {
    /// Subscribe and await the outcome as a future.
    ///
    /// Dropping the future before it resolves cancels the handle. A handle
    /// that is cancelled elsewhere resolves to [`AsyncError::cancelled`].
    fn into_future(self) -> Completion<D>
    where
        Self: Sized,
    {
        let (tx, rx) = oneshot::channel();
        let observer = Arc::new(OneshotObserver {
            tx: Mutex::new(Some(tx)),
        });
        let early = self.subscribe(observer).err().map(AsyncError::new);
        Completion {
            rx,
            handle: Some(Box::new(self)),
            early,
        }
    }
}

impl<D: Payload, A: AsyncResult<D> + ?Sized> AsyncResultExt<D> for A {}

/// Future returned by [`AsyncResultExt::into_future`].
pub struct Completion<D: 'static> {
    rx: oneshot::Receiver<Result<Arc<D>, AsyncError>>,
    handle: Option<BoxAsync<D>>,
    early: Option<AsyncError>,
}

impl<D: Payload> Future for Completion<D> {
    type Output = Result<Arc<D>, AsyncError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(err) = self.early.take() {
            self.handle = None;
            return Poll::Ready(Err(err));
        }
        let polled = Pin::new(&mut self.rx).poll(cx);
        match polled {
            Poll::Pending => Poll::Pending,
            Poll::Ready(outcome) => {
                self.handle = None;
                Poll::Ready(outcome.unwrap_or_else(|_| Err(AsyncError::cancelled())))
            }
        }
    }
}

impl<D: 'static> Drop for Completion<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

struct OneshotObserver<D> {
    tx: Mutex<Option<oneshot::Sender<Result<Arc<D>, AsyncError>>>>,
}

impl<D: Payload> OneshotObserver<D> {
    fn send(&self, outcome: Result<Arc<D>, AsyncError>) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(tx) = tx {
            let _ = tx.send(outcome);
        }
    }
}

impl<D: Payload> Observer<D> for OneshotObserver<D> {
    fn on_result(&self, data: Arc<D>) {
        self.send(Ok(data));
    }

    fn on_error(&self, error: AsyncError) {
        self.send(Err(error));
    }

    fn on_reset(&self) {
        self.send(Err(AsyncError::cancelled()));
    }
}
