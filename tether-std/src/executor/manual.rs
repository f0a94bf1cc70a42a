//! A delivery thread driven by explicit calls.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    thread::{self, ThreadId},
};
use tether_core::{Executor, Job};

/// An executor whose delivery thread is the thread that created it.
///
/// Jobs posted from that thread never queue, because [`run_or_post`] runs
/// them inline. Jobs posted from other threads sit in a queue until the owner
/// calls [`run_pending`](Self::run_pending).
///
/// [`run_or_post`]: tether_core::run_or_post
pub struct ManualExecutor {
    owner: ThreadId,
    queue: Mutex<VecDeque<Job>>,
}

impl ManualExecutor {
    /// Create an executor owned by the current thread.
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Run queued jobs until the queue is empty, including jobs queued by the
    /// jobs themselves. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let job = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            match job {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Number of jobs waiting.
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for ManualExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(job);
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tether_core::run_or_post;

    #[test]
    fn test_owner_runs_inline() {
        let executor = ManualExecutor::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        run_or_post(&executor, move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn test_foreign_thread_queues_in_order() {
        let executor = Arc::new(ManualExecutor::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let (ex, ord) = (executor.clone(), order.clone());
        thread::spawn(move || {
            assert!(!ex.is_current());
            for i in 0..3 {
                let ord = ord.clone();
                run_or_post(&*ex, move || ord.lock().unwrap().push(i));
            }
        })
        .join()
        .unwrap();

        assert!(order.lock().unwrap().is_empty());
        assert_eq!(executor.run_pending(), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }
}
