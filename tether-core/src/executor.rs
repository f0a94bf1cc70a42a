//! The delivery thread abstraction.
//!
//! Every slot mutation and observer callback runs on one serialized
//! "delivery thread". Completions that happen elsewhere are posted to it as
//! [`Job`]s.

/// A unit of delivery work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A serialized executor that owns the delivery thread.
pub trait Executor: Send + Sync + 'static {
    /// Queue a job. Jobs run one at a time, in submission order.
    fn execute(&self, job: Job);

    /// Returns `true` when called from the delivery thread itself.
    fn is_current(&self) -> bool;
}

/// Run `job` inline if already on the delivery thread, otherwise post it.
pub fn run_or_post<X, F>(executor: &X, job: F)
where
    X: Executor + ?Sized,
    F: FnOnce() + Send + 'static,
{
    if executor.is_current() {
        job()
    } else {
        executor.execute(Box::new(job))
    }
}
