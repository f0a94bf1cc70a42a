//! # Send
//!
//! One-shot, POST-like operations. Nothing runs until [`SendAsync::send`]
//! arms the delegated context with the call's provider. The slot delivers one
//! outcome and then tears itself down, so the next `send` always starts a new
//! execution. A `send` while another is running cancels the running one.
//!
//! A consumer recreated mid-send subscribes with the same id and receives the
//! outcome of the send that was already in flight.

use crate::{
    context::DeliveryContext,
    host::SharedHost,
    slot::{Freshness, Policy, Slot},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tether_core::{AsyncResult, ContractError, Payload, Provider, SharedObserver, SlotId};

struct SendState<D> {
    observer: Option<SharedObserver<D>>,
    cancelled: bool,
}

/// A consumer's handle to a send slot.
pub struct SendAsync<D> {
    host: SharedHost,
    id: SlotId,
    context: Arc<DeliveryContext<D>>,
    state: Mutex<SendState<D>>,
}

impl<D: Payload> SendAsync<D> {
    /// A handle for slot `id` of `host` using a delegated `context`.
    pub fn new(host: SharedHost, id: SlotId, context: DeliveryContext<D>) -> Self {
        Self {
            host,
            id,
            context: Arc::new(context),
            state: Mutex::new(SendState {
                observer: None,
                cancelled: false,
            }),
        }
    }

    /// A handle with a fresh delegated context and no release hook.
    pub fn delegated(host: SharedHost, id: SlotId) -> Self {
        Self::new(host, id, DeliveryContext::delegated())
    }

    /// The slot id.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// The live slot for this id, if a send is in flight or undelivered.
    pub fn slot(&self) -> Result<Option<Arc<Slot<D>>>, ContractError> {
        Slot::find(&self.host, self.id, Policy::Send)
    }

    /// Start a new execution from `provider`, cancelling one still running.
    ///
    /// Requires a prior `subscribe` and a delegated context. A no-op on a
    /// cancelled handle.
    pub fn send<P: Provider<D>>(&self, provider: P) -> Result<(), ContractError> {
        if !self.context.is_delegated() {
            return Err(ContractError::NotDelegated);
        }
        let observer = {
            let state = self.state();
            if state.cancelled {
                return Ok(());
            }
            state.observer.clone().ok_or(ContractError::NotSubscribed)?
        };

        let slot = Slot::obtain(
            Arc::clone(&self.host),
            self.id,
            Arc::clone(&self.context),
            Policy::Send,
        )?;
        slot.context().set_provider(provider)?;
        slot.reattach(observer, Freshness::Fresh)
    }

    /// Stop observing; a running send keeps going and its outcome waits for
    /// the next subscriber under the same id.
    pub fn detach(&self) {
        self.state().observer = None;
        if let Ok(Some(slot)) = self.slot() {
            slot.detach();
        }
    }

    fn state(&self) -> MutexGuard<'_, SendState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D: Payload> AsyncResult<D> for SendAsync<D> {
    fn subscribe(&self, observer: SharedObserver<D>) -> Result<(), ContractError> {
        {
            let mut state = self.state();
            if state.cancelled {
                return Ok(());
            }
            if state.observer.is_some() {
                return Err(ContractError::AlreadySubscribed);
            }
            state.observer = Some(Arc::clone(&observer));
        }

        match self.slot()? {
            Some(slot) => slot.reattach(observer, Freshness::Cached),
            None => Ok(()),
        }
    }

    /// Cancel the running send, if any, without notifying the observer.
    fn cancel(&self) {
        {
            let mut state = self.state();
            state.cancelled = true;
            state.observer = None;
        }
        if let Ok(Some(slot)) = self.slot() {
            slot.tear_down_quietly();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        executor::ManualExecutor,
        host::SlotMap,
        testing::{Event, ManualProvider, RecordingObserver},
    };

    fn host() -> Arc<SlotMap> {
        Arc::new(SlotMap::new(Arc::new(ManualExecutor::new())))
    }

    #[test]
    fn test_subscribe_alone_starts_nothing() {
        let host = host();
        let send = SendAsync::<u32>::delegated(host.clone(), 3);
        send.subscribe(RecordingObserver::new().shared()).unwrap();
        assert!(host.is_empty());
    }

    #[test]
    fn test_send_before_subscribe_fails() {
        let send = SendAsync::<u32>::delegated(host(), 3);
        assert_eq!(
            send.send(ManualProvider::<u32>::new()),
            Err(ContractError::NotSubscribed)
        );
    }

    #[test]
    fn test_send_tears_down_after_delivery() {
        let host = host();
        let provider = ManualProvider::<u32>::new();
        let send = SendAsync::delegated(host.clone(), 3);
        let observer = RecordingObserver::new();
        send.subscribe(observer.shared()).unwrap();

        send.send(provider.clone()).unwrap();
        assert!(host.contains(3));
        provider.last().unwrap().complete(1);

        assert_eq!(observer.events(), vec![Event::result(1)]);
        assert!(!host.contains(3));
    }

    #[test]
    fn test_cancel_stops_running_send() {
        let host = host();
        let provider = ManualProvider::<u32>::new();
        let send = SendAsync::delegated(host.clone(), 3);
        let observer = RecordingObserver::new();
        send.subscribe(observer.shared()).unwrap();
        send.send(provider.clone()).unwrap();

        send.cancel();
        assert!(provider.last().unwrap().is_cancelled());
        assert!(!provider.last().unwrap().complete(2));
        assert_eq!(observer.count(), 0);
        assert!(host.is_empty());
        assert_eq!(send.send(provider.clone()), Ok(()));
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_send_on_direct_context_creates_no_slot() {
        let host = host();
        let provider = ManualProvider::<u32>::new();
        let send = SendAsync::new(host.clone(), 3, DeliveryContext::direct(provider.clone()));
        send.subscribe(RecordingObserver::new().shared()).unwrap();

        assert_eq!(send.send(provider.clone()), Err(ContractError::NotDelegated));
        assert!(host.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_failed_send_ends_slot() {
        let host = host();
        let provider = ManualProvider::<u32>::new();
        let send = SendAsync::delegated(host.clone(), 3);
        let observer = RecordingObserver::new();
        send.subscribe(observer.shared()).unwrap();

        send.send(provider.clone()).unwrap();
        provider.last().unwrap().fail("rejected");
        assert_eq!(observer.events(), vec![Event::Error("rejected".into())]);
        assert!(host.is_empty());

        send.send(provider.clone()).unwrap();
        assert_eq!(provider.calls(), 2);
    }
}
