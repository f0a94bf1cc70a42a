//! Ready-made executions.
//!
//! - [`Ready`]: an outcome that is already known.
//! - [`Task`]: a blocking closure run on a [`Worker`] once subscribed.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
    thread,
};
use tether_core::{
    AsyncError, AsyncResult, BoxAsync, BoxError, CancelToken, ContractError, Job, Outcome,
    Payload, SharedObserver, Subscription,
};

// ============================================================================
// Ready
// ============================================================================

/// A handle whose outcome is known up front.
///
/// Delivers synchronously inside `subscribe`.
pub struct Ready<D> {
    subscription: Subscription<D>,
}

impl<D: Payload> Ready<D> {
    /// Settle with `outcome` before anyone subscribes.
    pub fn new(outcome: Outcome<D>) -> Self {
        let subscription = Subscription::new();
        subscription.complete(outcome);
        Self { subscription }
    }

    /// A handle that yields `value`.
    pub fn ok(value: D) -> Self {
        Self::new(Outcome::data(value))
    }

    /// A handle that yields this exact allocation.
    pub fn shared(value: Arc<D>) -> Self {
        Self::new(Outcome::Data(value))
    }

    /// A handle that fails with `error`.
    pub fn err(error: AsyncError) -> Self {
        Self::new(Outcome::Error(error))
    }

    /// Box the handle.
    pub fn boxed(self) -> BoxAsync<D> {
        Box::new(self)
    }
}

impl<D: Payload> AsyncResult<D> for Ready<D> {
    fn subscribe(&self, observer: SharedObserver<D>) -> Result<(), ContractError> {
        self.subscription.subscribe(observer).map(drop)
    }

    fn cancel(&self) {
        self.subscription.cancel();
    }
}

// ============================================================================
// Workers
// ============================================================================

/// Runs units of work off the delivery thread.
pub trait Worker: Send + Sync + 'static {
    /// Start `job`. Fails only if the job could not be scheduled.
    fn run(&self, job: Job) -> io::Result<()>;
}

/// Runs each job on a new OS thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadWorker {
    name: Option<String>,
}

impl ThreadWorker {
    /// A worker whose threads carry `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

impl Worker for ThreadWorker {
    fn run(&self, job: Job) -> io::Result<()> {
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        builder.spawn(job).map(drop)
    }
}

/// Runs each job on the calling thread, inside `subscribe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineWorker;

impl Worker for InlineWorker {
    fn run(&self, job: Job) -> io::Result<()> {
        job();
        Ok(())
    }
}

// ============================================================================
// Task
// ============================================================================

type Work<D> = Box<dyn FnOnce(&CancelToken) -> Result<D, BoxError> + Send>;

/// A blocking unit of work, started on a [`Worker`] when subscribed.
///
/// The closure receives a [`CancelToken`] it may poll to stop early; its
/// result is discarded once the handle is cancelled.
///
/// # Example
///
/// ```rust,ignore
/// let task = Task::new(|token| {
///     let rows = db.query("select 1")?;
///     Ok(rows)
/// });
/// ```
pub struct Task<D> {
    work: Mutex<Option<Work<D>>>,
    worker: Arc<dyn Worker>,
    token: CancelToken,
    subscription: Arc<Subscription<D>>,
}

impl<D: Payload> Task<D> {
    /// A task run on a fresh [`ThreadWorker`] thread.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<D, BoxError> + Send + 'static,
    {
        Self::on(Arc::new(ThreadWorker::default()), work)
    }

    /// A task run on `worker`.
    pub fn on<F>(worker: Arc<dyn Worker>, work: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<D, BoxError> + Send + 'static,
    {
        Self {
            work: Mutex::new(Some(Box::new(work))),
            worker,
            token: CancelToken::new(),
            subscription: Arc::new(Subscription::new()),
        }
    }

    /// Box the handle.
    pub fn boxed(self) -> BoxAsync<D> {
        Box::new(self)
    }
}

impl<D: Payload> AsyncResult<D> for Task<D> {
    fn subscribe(&self, observer: SharedObserver<D>) -> Result<(), ContractError> {
        if !self.subscription.subscribe(observer)? {
            return Ok(());
        }
        let Some(work) = self
            .work
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Ok(());
        };

        let token = self.token.clone();
        let subscription = Arc::clone(&self.subscription);
        let job: Job = Box::new(move || {
            if token.is_cancelled() {
                return;
            }
            let result = work(&token);
            subscription.resolve(result);
        });
        if let Err(err) = self.worker.run(job) {
            log_warn!(error = %err, "worker refused task");
            self.subscription
                .complete(Outcome::Error(AsyncError::new(err)));
        }
        Ok(())
    }

    fn cancel(&self) {
        self.token.cancel();
        self.subscription.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, RecordingObserver};
    use std::sync::mpsc;
    use tether_core::AsyncResultExt;

    #[test]
    fn test_ready_delivers_on_subscribe() {
        let observer = RecordingObserver::<u32>::new();
        let ready = Ready::ok(42);
        ready.subscribe(observer.shared()).unwrap();
        assert_eq!(observer.events(), vec![Event::result(42)]);
        assert_eq!(
            ready.subscribe(observer.shared()),
            Err(ContractError::AlreadySubscribed)
        );
    }

    #[test]
    fn test_inline_task_runs_inside_subscribe() {
        let observer = RecordingObserver::<String>::new();
        let task = Task::on(Arc::new(InlineWorker), |_| Ok("done".to_string()));
        task.subscribe(observer.shared()).unwrap();
        assert_eq!(observer.events(), vec![Event::result("done".to_string())]);
    }

    #[test]
    fn test_task_error_is_delivered_as_data() {
        let observer = RecordingObserver::<u32>::new();
        let task = Task::<u32>::on(Arc::new(InlineWorker), |_| Err("no rows".into()));
        task.subscribe(observer.shared()).unwrap();
        assert_eq!(observer.events(), vec![Event::Error("no rows".into())]);
    }

    #[test]
    fn test_task_does_not_start_before_subscribe() {
        let (tx, rx) = mpsc::channel::<()>();
        let task = Task::<u32>::new(move |_| {
            tx.send(()).unwrap();
            Ok(1)
        });
        assert!(rx.try_recv().is_err());
        drop(task);
    }

    #[test]
    fn test_cancelled_thread_task_stays_silent() {
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel::<bool>();
        let observer = RecordingObserver::<u32>::new();
        let task = Task::on(Arc::new(ThreadWorker::named("test-worker")), move |token| {
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            done_tx.send(token.is_cancelled()).unwrap();
            Ok(5)
        });
        task.subscribe(observer.shared()).unwrap();
        started_rx.recv().unwrap();
        task.cancel();
        release_tx.send(()).unwrap();

        assert!(done_rx.recv().unwrap(), "worker should see the cancel flag");
        assert_eq!(observer.count(), 0);
    }

    #[tokio::test]
    async fn test_task_into_future() {
        let task = Task::new(|_| Ok(6 * 7));
        let value = task.into_future().await.unwrap();
        assert_eq!(*value, 42);
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves_cancelled() {
        let task = Arc::new(Task::<u32>::new(|_| {
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(1)
        }));
        let future = Arc::clone(&task).into_future();
        task.cancel();
        let err = future.await.unwrap_err();
        assert_eq!(err, AsyncError::cancelled());
    }
}
