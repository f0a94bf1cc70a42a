//! A delivery thread backed by a dedicated OS thread.

use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::{Mutex, PoisonError, mpsc},
    thread::{self, JoinHandle, ThreadId},
};
use tether_core::{Executor, Job};

const DEFAULT_THREAD_NAME: &str = "tether-delivery";

/// Configuration for a [`LoopExecutor`].
#[derive(Debug, Clone)]
pub struct LoopExecutorBuilder {
    thread_name: String,
}

impl Default for LoopExecutorBuilder {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl LoopExecutorBuilder {
    /// Name of the delivery thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Spawn the delivery thread.
    pub fn build(self) -> io::Result<LoopExecutor> {
        let (tx, rx) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name(self.thread_name)
            .spawn(move || {
                for job in rx {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log_warn!("delivery job panicked");
                    }
                }
            })?;
        Ok(LoopExecutor {
            thread_id: handle.thread().id(),
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }
}

/// An executor that runs jobs on its own thread, in submission order.
///
/// Dropping it stops the thread after the queued jobs ran.
pub struct LoopExecutor {
    thread_id: ThreadId,
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LoopExecutor {
    /// Start configuring a loop executor.
    pub fn builder() -> LoopExecutorBuilder {
        LoopExecutorBuilder::default()
    }

    /// Spawn a loop executor with the default configuration.
    pub fn spawn() -> io::Result<Self> {
        Self::builder().build()
    }

    /// Block until every job queued before this call has run.
    ///
    /// Returns immediately when called from the delivery thread or after
    /// shutdown.
    pub fn flush(&self) {
        if self.is_current() {
            return;
        }
        let (done_tx, done_rx) = mpsc::channel();
        self.execute(Box::new(move || {
            let _ = done_tx.send(());
        }));
        let _ = done_rx.recv();
    }

    /// Stop accepting jobs and wait for the thread to drain.
    pub fn shutdown(&self) {
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        if self.is_current() {
            return;
        }
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Executor for LoopExecutor {
    fn execute(&self, job: Job) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => {
                if tx.send(job).is_err() {
                    log_warn!("delivery thread gone, job dropped");
                }
            }
            None => {
                log_debug!("executor shut down, job dropped");
            }
        }
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for LoopExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
