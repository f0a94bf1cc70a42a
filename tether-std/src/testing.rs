//! Testing utilities for Tether.
//!
//! This module provides doubles for every collaborator of a slot, so the
//! engine can be driven step by step from a test.
//!
//! # Features
//!
//! - [`RecordingObserver`]: An observer that records every callback
//! - [`ManualAsync`]: A handle the test completes by hand
//! - [`ManualProvider`]: A provider handing out [`ManualAsync`] handles
//! - [`RecordingReleaser`]: A release hook that records released values

use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use tether_core::{
    AsyncError, AsyncResult, BoxAsync, BoxError, ContractError, Observer, Outcome, Payload,
    Provider, Releaser, SharedObserver, Subscription,
};

// ============================================================================
// Recording Observer
// ============================================================================

/// One observer callback, as recorded by [`RecordingObserver`].
pub enum Event<D> {
    /// `on_result` was called.
    Result(Arc<D>),
    /// `on_error` was called with this message.
    Error(String),
    /// `on_reset` was called.
    Reset,
}

impl<D: fmt::Debug> fmt::Debug for Event<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Result(data) => f.debug_tuple("Result").field(data).finish(),
            Event::Error(msg) => f.debug_tuple("Error").field(msg).finish(),
            Event::Reset => f.write_str("Reset"),
        }
    }
}

impl<D: PartialEq> PartialEq for Event<D> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Event::Result(a), Event::Result(b)) => a == b,
            (Event::Error(a), Event::Error(b)) => a == b,
            (Event::Reset, Event::Reset) => true,
            _ => false,
        }
    }
}

impl<D> Event<D> {
    /// Shorthand for a recorded value.
    pub fn result(value: D) -> Self {
        Event::Result(Arc::new(value))
    }
}

/// An observer that records every callback it receives.
///
/// # Example
///
/// ```rust,ignore
/// let observer = RecordingObserver::<u32>::new();
/// handle.subscribe(observer.shared())?;
///
/// assert_eq!(observer.events(), vec![Event::result(42)]);
/// ```
pub struct RecordingObserver<D> {
    events: Arc<Mutex<Vec<Event<D>>>>,
}

impl<D: Payload> RecordingObserver<D> {
    /// Create an observer with an empty record.
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A type-erased clone that records into the same log.
    pub fn shared(&self) -> SharedObserver<D> {
        Arc::new(self.clone())
    }

    /// Take a snapshot of the recorded events.
    pub fn events(&self) -> Vec<Event<D>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| match event {
                Event::Result(data) => Event::Result(Arc::clone(data)),
                Event::Error(msg) => Event::Error(msg.clone()),
                Event::Reset => Event::Reset,
            })
            .collect()
    }

    /// Values received through `on_result`, in order.
    pub fn values(&self) -> Vec<Arc<D>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::Result(data) => Some(Arc::clone(data)),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded callbacks.
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl<D: Payload> Default for RecordingObserver<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for RecordingObserver<D> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}

impl<D: Payload> Observer<D> for RecordingObserver<D> {
    fn on_result(&self, data: Arc<D>) {
        self.events.lock().unwrap().push(Event::Result(data));
    }

    fn on_error(&self, error: AsyncError) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Error(error.to_string()));
    }

    fn on_reset(&self) {
        self.events.lock().unwrap().push(Event::Reset);
    }
}

// ============================================================================
// Manual Async
// ============================================================================

struct ManualState<D> {
    subscription: Subscription<D>,
    subscribed: AtomicBool,
}

/// A handle completed explicitly by the test, from any thread.
///
/// Clones share state: keep one clone in the test and hand the other out.
pub struct ManualAsync<D> {
    state: Arc<ManualState<D>>,
}

impl<D: Payload> ManualAsync<D> {
    /// Create an unsubscribed, unsettled handle.
    pub fn new() -> Self {
        Self {
            state: Arc::new(ManualState {
                subscription: Subscription::new(),
                subscribed: AtomicBool::new(false),
            }),
        }
    }

    /// Settle with a value. Returns `true` if an observer received it.
    pub fn complete(&self, value: D) -> bool {
        self.state.subscription.complete(Outcome::data(value))
    }

    /// Settle with a value the caller keeps a reference to.
    pub fn complete_shared(&self, value: Arc<D>) -> bool {
        self.state.subscription.complete(Outcome::Data(value))
    }

    /// Settle with an error. Returns `true` if an observer received it.
    pub fn fail(&self, message: &str) -> bool {
        self.state.subscription.complete(Outcome::Error(AsyncError::msg(message)))
    }

    /// Returns `true` once `subscribe` was called.
    pub fn is_subscribed(&self) -> bool {
        self.state.subscribed.load(Ordering::SeqCst)
    }

    /// Returns `true` once `cancel` was called.
    pub fn is_cancelled(&self) -> bool {
        self.state.subscription.is_cancelled()
    }
}

impl<D: Payload> Default for ManualAsync<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for ManualAsync<D> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<D: Payload> AsyncResult<D> for ManualAsync<D> {
    fn subscribe(&self, observer: SharedObserver<D>) -> Result<(), ContractError> {
        self.state.subscription.subscribe(observer)?;
        self.state.subscribed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn cancel(&self) {
        self.state.subscription.cancel();
    }
}

// ============================================================================
// Manual Provider
// ============================================================================

/// A provider that hands out [`ManualAsync`] handles and remembers them.
pub struct ManualProvider<D> {
    handed_out: Arc<Mutex<Vec<ManualAsync<D>>>>,
}

impl<D: Payload> ManualProvider<D> {
    /// Create a provider that has not been called.
    pub fn new() -> Self {
        Self {
            handed_out: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times `provide` was called.
    pub fn calls(&self) -> usize {
        self.handed_out.lock().unwrap().len()
    }

    /// The `index`-th handle handed out.
    pub fn handle(&self, index: usize) -> Option<ManualAsync<D>> {
        self.handed_out.lock().unwrap().get(index).cloned()
    }

    /// The most recent handle handed out.
    pub fn last(&self) -> Option<ManualAsync<D>> {
        self.handed_out.lock().unwrap().last().cloned()
    }
}

impl<D: Payload> Default for ManualProvider<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for ManualProvider<D> {
    fn clone(&self) -> Self {
        Self {
            handed_out: self.handed_out.clone(),
        }
    }
}

impl<D: Payload> Provider<D> for ManualProvider<D> {
    fn provide(&self) -> BoxAsync<D> {
        let handle = ManualAsync::new();
        self.handed_out.lock().unwrap().push(handle.clone());
        Box::new(handle)
    }
}

// ============================================================================
// Recording Releaser
// ============================================================================

/// A release hook that records a copy of every value it releases.
pub struct RecordingReleaser<D> {
    released: Arc<Mutex<Vec<D>>>,
}

impl<D: Payload + Clone> RecordingReleaser<D> {
    /// Create a releaser with an empty record.
    pub fn new() -> Self {
        Self {
            released: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Values released so far, in order.
    pub fn released(&self) -> Vec<D> {
        self.released.lock().unwrap().clone()
    }

    /// Number of release calls.
    pub fn count(&self) -> usize {
        self.released.lock().unwrap().len()
    }
}

impl<D: Payload + Clone> Default for RecordingReleaser<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for RecordingReleaser<D> {
    fn clone(&self) -> Self {
        Self {
            released: self.released.clone(),
        }
    }
}

impl<D: Payload + Clone> Releaser<D> for RecordingReleaser<D> {
    fn release(&self, data: &D) -> Result<(), BoxError> {
        self.released.lock().unwrap().push(data.clone());
        Ok(())
    }
}
