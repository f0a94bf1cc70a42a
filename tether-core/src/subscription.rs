//! Single-observer bookkeeping shared by execution handles.

use crate::{
    error::{AsyncError, BoxError, ContractError},
    observer::SharedObserver,
    outcome::Outcome,
};
use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

enum State<D> {
    /// No observer yet, nothing settled.
    Open,
    /// Settled before anyone subscribed; handed to the first subscriber.
    Early(Outcome<D>),
    Subscribed(SharedObserver<D>),
    /// The observer is being called on this thread.
    Delivering(ThreadId),
    Settled,
    Cancelled,
}

/// The observer slot of one [`AsyncResult`](crate::AsyncResult) handle.
///
/// Enforces the handle contract: one observer, at most one delivery, and
/// silence after cancellation. Implementations of `AsyncResult` embed one and
/// call [`complete`](Self::complete) from wherever their work finishes.
///
/// A `cancel` racing with a delivery on another thread waits for the callback
/// to return, so once `cancel` returns the observer is never called again.
pub struct Subscription<D> {
    state: Mutex<State<D>>,
    delivered: Condvar,
}

impl<D> Default for Subscription<D> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::Open),
            delivered: Condvar::new(),
        }
    }
}

impl<D: 'static> Subscription<D> {
    /// Create an open subscription.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the observer.
    ///
    /// Returns `Ok(true)` when the caller should start the work, `Ok(false)`
    /// when the handle is inert (cancelled or already settled early and just
    /// delivered).
    pub fn subscribe(&self, observer: SharedObserver<D>) -> Result<bool, ContractError> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, State::Settled) {
            State::Open => {
                *state = State::Subscribed(observer);
                Ok(true)
            }
            State::Early(outcome) => {
                self.hand_over(state, observer, outcome);
                Ok(false)
            }
            State::Cancelled => {
                *state = State::Cancelled;
                Ok(false)
            }
            previous @ (State::Subscribed(_) | State::Delivering(_) | State::Settled) => {
                *state = previous;
                Err(ContractError::AlreadySubscribed)
            }
        }
    }

    /// Settle with an outcome. Returns `true` if an observer received it.
    ///
    /// Only the first completion counts; later ones and completions after
    /// `cancel` are dropped.
    pub fn complete(&self, outcome: Outcome<D>) -> bool {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, State::Settled) {
            State::Open => {
                *state = State::Early(outcome);
                false
            }
            State::Subscribed(observer) => {
                self.hand_over(state, observer, outcome);
                true
            }
            previous => {
                *state = previous;
                false
            }
        }
    }

    /// Settle from the result of a unit of work.
    pub fn resolve(&self, result: Result<D, BoxError>) -> bool {
        self.complete(result.map_err(AsyncError::from).into())
    }

    /// Move to the cancelled state, dropping any observer.
    ///
    /// Returns `true` if the handle was still live. Called from a thread other
    /// than the one delivering, waits for the delivery to finish first.
    pub fn cancel(&self) -> bool {
        let current = thread::current().id();
        let mut state = self.lock();
        while matches!(*state, State::Delivering(owner) if owner != current) {
            state = self
                .delivered
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        match std::mem::replace(&mut *state, State::Cancelled) {
            State::Open | State::Early(_) | State::Subscribed(_) | State::Delivering(_) => true,
            State::Settled => {
                *state = State::Settled;
                false
            }
            State::Cancelled => false,
        }
    }

    /// Check whether the handle was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.lock(), State::Cancelled)
    }

    fn lock(&self) -> MutexGuard<'_, State<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Call the observer outside the lock, marking the delivery in progress.
    fn hand_over(
        &self,
        mut state: MutexGuard<'_, State<D>>,
        observer: SharedObserver<D>,
        outcome: Outcome<D>,
    ) {
        *state = State::Delivering(thread::current().id());
        drop(state);
        let _done = Handover(self);
        outcome.deliver_to(&*observer);
    }
}

/// Marks the delivery finished, also when the observer panics.
struct Handover<'a, D>(&'a Subscription<D>);

impl<D> Drop for Handover<'_, D> {
    fn drop(&mut self) {
        let mut state = self.0.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, State::Delivering(_)) {
            *state = State::Settled;
        }
        drop(state);
        self.0.delivered.notify_all();
    }
}
