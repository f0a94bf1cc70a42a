//! Executions backed by futures.
//!
//! A [`FutureTask`] is spawned on a [`Spawner`] when subscribed and aborted
//! through an [`AbortHandle`] when cancelled.

use futures::{
    executor::ThreadPool,
    future::{AbortHandle, AbortRegistration, Abortable, BoxFuture, FutureExt},
};
use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};
use tether_core::{
    AsyncError, AsyncResult, BoxAsync, BoxError, ContractError, Outcome, Payload, SharedObserver,
    Subscription,
};

/// Runs futures off the delivery thread.
pub trait Spawner: Send + Sync + 'static {
    /// Spawn a detached future.
    fn spawn(&self, future: BoxFuture<'static, ()>) -> Result<(), BoxError>;
}

impl Spawner for ThreadPool {
    fn spawn(&self, future: BoxFuture<'static, ()>) -> Result<(), BoxError> {
        self.spawn_ok(future);
        Ok(())
    }
}

#[cfg(feature = "tokio")]
impl Spawner for tokio::runtime::Handle {
    fn spawn(&self, future: BoxFuture<'static, ()>) -> Result<(), BoxError> {
        drop(tokio::runtime::Handle::spawn(self, future));
        Ok(())
    }
}

struct Pending<D> {
    future: BoxFuture<'static, Result<D, BoxError>>,
    registration: AbortRegistration,
}

/// A future-backed unit of work.
pub struct FutureTask<D> {
    pending: Mutex<Option<Pending<D>>>,
    abort: AbortHandle,
    spawner: Arc<dyn Spawner>,
    subscription: Arc<Subscription<D>>,
}

impl<D: Payload> FutureTask<D> {
    /// Wrap `future`, to be spawned on `spawner` once subscribed.
    pub fn new<F>(spawner: Arc<dyn Spawner>, future: F) -> Self
    where
        F: Future<Output = Result<D, BoxError>> + Send + 'static,
    {
        let (abort, registration) = AbortHandle::new_pair();
        Self {
            pending: Mutex::new(Some(Pending {
                future: future.boxed(),
                registration,
            })),
            abort,
            spawner,
            subscription: Arc::new(Subscription::new()),
        }
    }

    /// Box the handle.
    pub fn boxed(self) -> BoxAsync<D> {
        Box::new(self)
    }
}

impl<D: Payload> AsyncResult<D> for FutureTask<D> {
    fn subscribe(&self, observer: SharedObserver<D>) -> Result<(), ContractError> {
        if !self.subscription.subscribe(observer)? {
            return Ok(());
        }
        let Some(Pending {
            future,
            registration,
        }) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Ok(());
        };

        let subscription = Arc::clone(&self.subscription);
        let task = Abortable::new(future, registration);
        let spawned = self.spawner.spawn(
            async move {
                if let Ok(result) = task.await {
                    subscription.resolve(result);
                }
            }
            .boxed(),
        );
        if let Err(err) = spawned {
            log_warn!(error = %err, "spawner refused future");
            self.subscription.complete(Outcome::Error(AsyncError::from(err)));
        }
        Ok(())
    }

    fn cancel(&self) {
        self.abort.abort();
        self.subscription.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use tether_core::AsyncResultExt;

    fn pool() -> Arc<dyn Spawner> {
        Arc::new(ThreadPool::builder().pool_size(1).create().unwrap())
    }

    #[tokio::test]
    async fn test_future_task_resolves() {
        let task = FutureTask::new(pool(), async { Ok::<_, BoxError>(String::from("hello")) });
        let value = task.into_future().await.unwrap();
        assert_eq!(value.as_str(), "hello");
    }

    #[tokio::test]
    async fn test_future_task_error() {
        let task = FutureTask::<u8>::new(pool(), async { Err::<u8, BoxError>("timed out".into()) });
        let err = task.into_future().await.unwrap_err();
        assert_eq!(err.to_string(), "timed out");
    }

    #[tokio::test]
    async fn test_cancel_aborts_future() {
        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        let (dropped_tx, dropped_rx) = oneshot::channel::<()>();
        struct NotifyOnDrop(Option<oneshot::Sender<()>>);
        impl Drop for NotifyOnDrop {
            fn drop(&mut self) {
                if let Some(tx) = self.0.take() {
                    let _ = tx.send(());
                }
            }
        }

        let guard = NotifyOnDrop(Some(dropped_tx));
        let task = Arc::new(FutureTask::<u8>::new(pool(), async move {
            let _guard = guard;
            let _ = gate_rx.await;
            Ok::<u8, BoxError>(1)
        }));
        let completion = Arc::clone(&task).into_future();
        task.cancel();

        dropped_rx.await.unwrap();
        assert_eq!(completion.await.unwrap_err(), AsyncError::cancelled());
        drop(gate_tx);
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn test_tokio_spawner() {
        let spawner: Arc<dyn Spawner> = Arc::new(tokio::runtime::Handle::current());
        let task = FutureTask::new(spawner, async { Ok::<_, BoxError>(9u8) });
        assert_eq!(*task.into_future().await.unwrap(), 9);
    }
}
