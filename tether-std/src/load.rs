//! # Load
//!
//! Idempotent, GET-like operations. The outcome is cached in the slot and
//! replayed whenever a consumer subscribes again under the same id, until
//! [`LoadAsync::refresh`] asks for new work.

use crate::{
    context::DeliveryContext,
    host::SharedHost,
    slot::{Freshness, Policy, Slot},
};
use std::{
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tether_core::{AsyncResult, ContractError, Payload, Provider, SharedObserver, SlotId};

enum Binding<D> {
    Unbound,
    /// A subscribe is attaching to the slot; holds the binding it replaces.
    Subscribing(Box<Binding<D>>),
    Attached(Arc<Slot<D>>),
    Detached(Arc<Slot<D>>),
    Cancelled,
}

/// A consumer's handle to a load slot.
///
/// Create one per consumer incarnation. `subscribe` attaches to the slot
/// stored under the id (creating it on first use); a recreated consumer that
/// subscribes with the same id receives the cached outcome without the
/// provider being called again.
pub struct LoadAsync<D> {
    host: SharedHost,
    id: SlotId,
    context: Arc<DeliveryContext<D>>,
    binding: Mutex<Binding<D>>,
}

impl<D: Payload> LoadAsync<D> {
    /// A handle for slot `id` of `host`, created with `context` if absent.
    pub fn new(host: SharedHost, id: SlotId, context: DeliveryContext<D>) -> Self {
        Self {
            host,
            id,
            context: Arc::new(context),
            binding: Mutex::new(Binding::Unbound),
        }
    }

    /// A handle whose slot provides straight from `provider`.
    pub fn from_provider<P: Provider<D>>(host: SharedHost, id: SlotId, provider: P) -> Self {
        Self::new(host, id, DeliveryContext::direct(provider))
    }

    /// The slot id.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// The slot this handle is bound to, once subscribed.
    pub fn slot(&self) -> Option<Arc<Slot<D>>> {
        match &*self.binding() {
            Binding::Attached(slot) | Binding::Detached(slot) => Some(Arc::clone(slot)),
            Binding::Unbound | Binding::Subscribing(_) | Binding::Cancelled => None,
        }
    }

    /// Stop observing, leaving the slot and any running work in place.
    ///
    /// Used when the consumer goes away but is expected back; the next
    /// subscribe under the same id picks up the cached outcome.
    pub fn detach(&self) {
        let mut binding = self.binding();
        let Binding::Attached(slot) = &*binding else {
            return;
        };
        let slot = Arc::clone(slot);
        *binding = Binding::Detached(Arc::clone(&slot));
        drop(binding);
        slot.detach();
    }

    /// Discard the running execution and start a new one.
    pub fn refresh(&self) -> Result<(), ContractError> {
        let slot = self.slot().ok_or(ContractError::NotSubscribed)?;
        slot.force_refresh()
    }

    fn binding(&self) -> MutexGuard<'_, Binding<D>> {
        self.binding.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D: Payload> AsyncResult<D> for LoadAsync<D> {
    fn subscribe(&self, observer: SharedObserver<D>) -> Result<(), ContractError> {
        let mut binding = self.binding();
        match &*binding {
            Binding::Attached(_) | Binding::Subscribing(_) => {
                return Err(ContractError::AlreadySubscribed);
            }
            Binding::Cancelled => return Ok(()),
            Binding::Unbound | Binding::Detached(_) => {}
        }
        let previous = mem::replace(&mut *binding, Binding::Unbound);
        *binding = Binding::Subscribing(Box::new(previous));
        drop(binding);

        let attached = Slot::attach(
            Arc::clone(&self.host),
            self.id,
            Arc::clone(&self.context),
            Policy::Load,
            observer,
            Freshness::Cached,
        );

        let mut binding = self.binding();
        let slot = match attached {
            Ok(slot) => slot,
            Err(err) => {
                if matches!(*binding, Binding::Subscribing(_)) {
                    if let Binding::Subscribing(previous) =
                        mem::replace(&mut *binding, Binding::Unbound)
                    {
                        *binding = *previous;
                    }
                }
                return Err(err);
            }
        };
        if matches!(*binding, Binding::Cancelled) {
            drop(binding);
            slot.tear_down_quietly();
            return Ok(());
        }
        *binding = Binding::Attached(slot);
        Ok(())
    }

    /// Tear the slot down: the running execution is cancelled, the cached
    /// value released, and the observer is not called again.
    fn cancel(&self) {
        let mut previous = mem::replace(&mut *self.binding(), Binding::Cancelled);
        if let Binding::Subscribing(replaced) = previous {
            previous = *replaced;
        }
        if let Binding::Attached(slot) | Binding::Detached(slot) = previous {
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
        slot::SlotState,
        testing::{Event, ManualProvider, RecordingObserver},
    };
    use std::sync::Weak;
    use tether_core::BoxAsync;

    fn host() -> Arc<SlotMap> {
        Arc::new(SlotMap::new(Arc::new(ManualExecutor::new())))
    }

    #[test]
    fn test_double_subscribe_fails() {
        let host = host();
        let provider = ManualProvider::<u32>::new();
        let load = LoadAsync::from_provider(host, 1, provider);
        load.subscribe(RecordingObserver::new().shared()).unwrap();
        assert_eq!(
            load.subscribe(RecordingObserver::new().shared()),
            Err(ContractError::AlreadySubscribed)
        );
    }

    #[test]
    fn test_detach_then_resubscribe_replays() {
        let host = host();
        let provider = ManualProvider::<u32>::new();
        let load = LoadAsync::from_provider(host.clone(), 1, provider.clone());
        let first = RecordingObserver::new();
        load.subscribe(first.shared()).unwrap();
        provider.last().unwrap().complete(10);
        load.detach();

        let second = RecordingObserver::new();
        load.subscribe(second.shared()).unwrap();
        assert_eq!(second.events(), vec![Event::result(10)]);
        assert_eq!(first.count(), 1);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_cancel_tears_down_quietly() {
        let host = host();
        let provider = ManualProvider::<u32>::new();
        let load = LoadAsync::from_provider(host.clone(), 4, provider.clone());
        let observer = RecordingObserver::new();
        load.subscribe(observer.shared()).unwrap();
        let slot = load.slot().unwrap();

        load.cancel();
        load.cancel();
        assert!(provider.last().unwrap().is_cancelled());
        assert_eq!(slot.state(), SlotState::TornDown);
        assert!(!host.contains(4));
        assert_eq!(observer.count(), 0);

        load.subscribe(RecordingObserver::new().shared()).unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_refresh_requires_subscription() {
        let load = LoadAsync::from_provider(host(), 2, ManualProvider::<u32>::new());
        assert_eq!(load.refresh(), Err(ContractError::NotSubscribed));
    }

    #[test]
    fn test_subscribe_while_subscribing_fails() {
        let host = host();
        let provider = ManualProvider::<u32>::new();
        let cell: Arc<Mutex<Weak<LoadAsync<u32>>>> = Arc::new(Mutex::new(Weak::new()));
        let nested = Arc::new(Mutex::new(Vec::new()));
        let (reenter, results, inner) = (cell.clone(), nested.clone(), provider.clone());
        let context = DeliveryContext::direct(move || -> BoxAsync<u32> {
            if let Some(load) = reenter.lock().unwrap().upgrade() {
                let outcome = load.subscribe(RecordingObserver::new().shared());
                results.lock().unwrap().push(outcome);
            }
            inner.provide()
        });
        let load = Arc::new(LoadAsync::new(host.clone(), 5, context));
        *cell.lock().unwrap() = Arc::downgrade(&load);

        let observer = RecordingObserver::new();
        load.subscribe(observer.shared()).unwrap();
        assert_eq!(*nested.lock().unwrap(), vec![Err(ContractError::AlreadySubscribed)]);
        assert_eq!(provider.calls(), 1);
        assert!(load.slot().is_some());

        provider.last().unwrap().complete(6);
        assert_eq!(observer.events(), vec![Event::result(6)]);
    }

    #[test]
    fn test_failed_subscribe_restores_binding() {
        let host = host();
        Slot::obtain(
            host.clone(),
            6,
            Arc::new(DeliveryContext::direct(ManualProvider::<String>::new())),
            Policy::Load,
        )
        .unwrap();
        let load = LoadAsync::from_provider(host, 6, ManualProvider::<u32>::new());
        assert!(matches!(
            load.subscribe(RecordingObserver::new().shared()),
            Err(ContractError::SlotMismatch { id: 6, .. })
        ));
        assert!(load.slot().is_none());
        assert!(matches!(
            load.subscribe(RecordingObserver::new().shared()),
            Err(ContractError::SlotMismatch { id: 6, .. })
        ));
    }
}
