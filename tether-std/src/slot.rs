//! # Persistent Slot Engine
//!
//! A [`Slot`] is the host-scoped unit of persistence: it runs at most one
//! execution at a time, caches the last outcome, and replays that outcome to
//! observers that attach later (for example after the consumer was recreated)
//! without running the work again.
//!
//! # States
//!
//! ```text
//! Idle -> Loading -> Delivered <-> Loading (refresh)
//!   any -> Stopped (detach) -> Loading/Delivered (reattach)
//!   any -> TornDown (terminal)
//! ```
//!
//! # Threading
//!
//! Observer callbacks, the release of values a slot gives up, and `on_reset`
//! run on the host's delivery thread; completions arriving on worker threads
//! are posted there. Transitions are serialized by the slot lock. A detach or
//! teardown requested from another thread waits for a callback in progress,
//! so once it returns the detached observer is not called again.
//!
//! The slot lock is never held while user code (providers, observers,
//! release hooks, `subscribe`/`cancel` of executions) runs.

use crate::{
    context::DeliveryContext,
    host::{ErasedSlot, HostContainer, SharedHost},
    release,
};
use std::{
    any::{Any, type_name},
    mem,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak},
};
use tether_core::{
    AsyncError, ContractError, Executor, Observer, Outcome, Payload, SharedAsync, SharedObserver,
    SlotId, run_or_post,
};

/// Caching semantics of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Idempotent: the outcome is cached and replayed until refreshed.
    Load,
    /// One-shot: the slot tears itself down after delivering its outcome.
    Send,
}

/// Whether an attach may replay the cached outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Freshness {
    /// Replay the cache if there is one; otherwise start work if none runs.
    #[default]
    Cached,
    /// Cancel any running execution and start a new one.
    Fresh,
}

/// Observable state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing delivered and nothing running.
    Idle,
    /// An execution is outstanding.
    Loading,
    /// An outcome is cached and no execution runs.
    Delivered,
    /// No observer is attached; completions are still cached.
    Stopped,
    /// Terminal.
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Started,
    Stopped,
    TornDown,
}

struct Running<D> {
    generation: u64,
    handle: SharedAsync<D>,
}

struct Inner<D> {
    phase: Phase,
    execution: Option<Running<D>>,
    generation: u64,
    cached: Outcome<D>,
    observer: Option<SharedObserver<D>>,
    attachment: u64,
    delivering: bool,
}

/// A host-persistent holder of one in-flight execution and one cached outcome.
pub struct Slot<D> {
    id: SlotId,
    policy: Policy,
    context: Arc<DeliveryContext<D>>,
    delivery: Arc<dyn Executor>,
    host: Weak<dyn HostContainer>,
    this: Weak<Slot<D>>,
    inner: Mutex<Inner<D>>,
    idle: Condvar,
}

impl<D: Payload> Slot<D> {
    /// Find the slot stored under `id`, if any.
    ///
    /// Fails with [`ContractError::SlotMismatch`] when the stored slot has a
    /// different payload type or policy.
    pub fn find(
        host: &SharedHost,
        id: SlotId,
        policy: Policy,
    ) -> Result<Option<Arc<Self>>, ContractError> {
        let Some(existing) = host.get_slot(id) else {
            return Ok(None);
        };
        let mismatch = ContractError::SlotMismatch {
            id,
            expected: type_name::<D>(),
        };
        let slot = existing.into_any().downcast::<Self>().map_err(|_| mismatch.clone())?;
        if slot.policy != policy {
            return Err(mismatch);
        }
        Ok(Some(slot))
    }

    /// Find the slot stored under `id`, creating it with `context` if absent.
    ///
    /// An existing slot keeps the context it was created with.
    pub fn obtain(
        host: SharedHost,
        id: SlotId,
        context: Arc<DeliveryContext<D>>,
        policy: Policy,
    ) -> Result<Arc<Self>, ContractError> {
        if let Some(slot) = Self::find(&host, id, policy)? {
            return Ok(slot);
        }
        let slot = Arc::new_cyclic(|this| Slot {
            id,
            policy,
            context,
            delivery: host.delivery(),
            host: Arc::downgrade(&host),
            this: this.clone(),
            inner: Mutex::new(Inner {
                phase: Phase::Created,
                execution: None,
                generation: 0,
                cached: Outcome::Pending,
                observer: None,
                attachment: 0,
                delivering: false,
            }),
            idle: Condvar::new(),
        });
        host.put_slot(id, slot.clone());
        log_debug!(slot = id, ?policy, "slot created");
        Ok(slot)
    }

    /// Look up or create the slot and attach `observer` to it.
    ///
    /// With [`Freshness::Cached`] a cached outcome is delivered to the
    /// observer (inline when called on the delivery thread) and no work
    /// starts; otherwise an execution is started unless one is running.
    pub fn attach(
        host: SharedHost,
        id: SlotId,
        context: Arc<DeliveryContext<D>>,
        policy: Policy,
        observer: SharedObserver<D>,
        freshness: Freshness,
    ) -> Result<Arc<Self>, ContractError> {
        let slot = Self::obtain(host, id, context, policy)?;
        slot.reattach(observer, freshness)?;
        Ok(slot)
    }

    /// Attach `observer` to this slot, replacing any observer attached before.
    pub fn reattach(
        &self,
        observer: SharedObserver<D>,
        freshness: Freshness,
    ) -> Result<(), ContractError> {
        let mut inner = self.lock_idle();
        if inner.phase == Phase::TornDown {
            return Err(ContractError::TornDown(self.id));
        }
        inner.phase = Phase::Started;
        inner.observer = Some(observer);
        inner.attachment += 1;
        let attachment = inner.attachment;
        let replay = freshness == Freshness::Cached && !inner.cached.is_pending();
        let running = inner.execution.is_some();
        log_debug!(slot = self.id, ?freshness, replay, "observer attached");
        drop(inner);

        if replay {
            if let Some(this) = self.this.upgrade() {
                run_or_post(&*self.delivery, move || this.deliver(attachment));
            }
            return Ok(());
        }
        match freshness {
            Freshness::Fresh => self.start(true),
            Freshness::Cached if !running => self.start(false),
            Freshness::Cached => Ok(()),
        }
    }

    /// Stop forwarding to the attached observer.
    ///
    /// A running execution is left alone; its outcome is cached for the next
    /// attach.
    pub fn detach(&self) {
        let mut inner = self.lock_idle();
        if inner.phase == Phase::TornDown {
            return;
        }
        inner.phase = Phase::Stopped;
        inner.observer = None;
        log_debug!(slot = self.id, "observer detached");
    }

    /// Cancel the running execution, if any, and start a new one.
    ///
    /// The cached outcome stays until the new execution replaces it. A
    /// delegated context that is not armed only cancels.
    pub fn force_refresh(&self) -> Result<(), ContractError> {
        if self.lock().phase == Phase::TornDown {
            return Err(ContractError::TornDown(self.id));
        }
        log_debug!(slot = self.id, "refresh forced");
        self.start(true)
    }

    /// Cancel the running execution, release the cached outcome, notify the
    /// attached observer through [`Observer::on_reset`], and remove the slot
    /// from its host. Idempotent.
    pub fn tear_down(&self) {
        self.shut_down(true);
    }

    /// Like [`tear_down`](Self::tear_down) without notifying the observer.
    pub(crate) fn tear_down_quietly(&self) {
        self.shut_down(false);
    }

    /// The id this slot is stored under.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// The policy this slot was created with.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// The context this slot was created with.
    pub fn context(&self) -> &Arc<DeliveryContext<D>> {
        &self.context
    }

    /// The cached outcome.
    pub fn cached(&self) -> Outcome<D> {
        self.lock().cached.clone()
    }

    /// The current state.
    pub fn state(&self) -> SlotState {
        let inner = self.lock();
        match inner.phase {
            Phase::TornDown => SlotState::TornDown,
            Phase::Stopped => SlotState::Stopped,
            Phase::Created | Phase::Started if inner.execution.is_some() => SlotState::Loading,
            Phase::Created | Phase::Started if !inner.cached.is_pending() => SlotState::Delivered,
            Phase::Created | Phase::Started => SlotState::Idle,
        }
    }

    /// Returns `true` while an execution is outstanding.
    pub fn is_loading(&self) -> bool {
        self.lock().execution.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<D>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock, first waiting out a callback in progress on the delivery
    /// thread when called from elsewhere.
    fn lock_idle(&self) -> MutexGuard<'_, Inner<D>> {
        let current = self.delivery.is_current();
        let mut inner = self.lock();
        while inner.delivering && !current {
            inner = self.idle.wait(inner).unwrap_or_else(PoisonError::into_inner);
        }
        inner
    }

    /// Start an execution if the context is armed.
    ///
    /// With `replace` a running execution is cancelled in favour of the new
    /// one; otherwise a running execution wins and nothing starts.
    fn start(&self, replace: bool) -> Result<(), ContractError> {
        if !self.context.is_armed() {
            if replace {
                let superseded = self.lock().execution.take();
                release::cancel_execution(superseded.map(|r| r.handle));
            }
            return Ok(());
        }

        let handle: SharedAsync<D> = Arc::from(self.context.provide()?);
        let mut inner = self.lock();
        if inner.phase == Phase::TornDown || (!replace && inner.execution.is_some()) {
            drop(inner);
            handle.cancel();
            return Ok(());
        }
        inner.generation += 1;
        let generation = inner.generation;
        let superseded = inner.execution.replace(Running {
            generation,
            handle: Arc::clone(&handle),
        });
        drop(inner);
        log_debug!(slot = self.id, generation, "execution started");

        release::cancel_execution(superseded.map(|r| r.handle));
        let relay = Arc::new(Relay {
            slot: self.this.clone(),
            generation,
        });
        if let Err(err) = handle.subscribe(relay) {
            let mut inner = self.lock();
            if inner
                .execution
                .as_ref()
                .is_some_and(|r| r.generation == generation)
            {
                inner.execution = None;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Apply a completion on the delivery thread.
    fn settle(&self, generation: u64, outcome: Outcome<D>) {
        let mut inner = self.lock();
        let current = inner
            .execution
            .as_ref()
            .is_some_and(|r| r.generation == generation);
        if !current || inner.phase == Phase::TornDown {
            let cached = outcome.same_value(&inner.cached);
            drop(inner);
            log_debug!(slot = self.id, generation, "stale completion dropped");
            if !cached {
                release::discard(&self.context, outcome);
            }
            return;
        }

        inner.execution = None;
        let previous = mem::replace(&mut inner.cached, outcome.clone());
        let attachment = inner.attachment;
        drop(inner);

        release::retire(&self.context, previous, &outcome);
        self.deliver(attachment);
    }

    /// Hand the cached outcome to the observer of `attachment` if that
    /// observer is still attached. Runs on the delivery thread.
    fn deliver(&self, attachment: u64) {
        let mut inner = self.lock();
        if inner.phase != Phase::Started
            || inner.attachment != attachment
            || inner.cached.is_pending()
        {
            return;
        }
        let Some(observer) = inner.observer.clone() else {
            return;
        };
        let cached = inner.cached.clone();
        inner.delivering = true;
        drop(inner);

        {
            let _done = Delivering(self);
            cached.deliver_to(&*observer);
        }
        self.delivered();
    }

    /// Send slots end once their outcome reached an observer.
    fn delivered(&self) {
        if self.policy == Policy::Send {
            self.shut_down(false);
        }
    }

    fn shut_down(&self, notify: bool) {
        let mut inner = self.lock_idle();
        if inner.phase == Phase::TornDown {
            return;
        }
        inner.phase = Phase::TornDown;
        let execution = inner.execution.take().map(|r| r.handle);
        let cached = mem::take(&mut inner.cached);
        let observer = inner.observer.take().filter(|_| notify);
        drop(inner);

        release::cancel_execution(execution);
        if let Some(host) = self.host.upgrade() {
            // The id may already hold a replacement slot.
            let stored = host.get_slot(self.id).is_some_and(|slot| {
                Arc::as_ptr(&slot).cast::<()>() == (self as *const Self).cast::<()>()
            });
            if stored {
                host.destroy_slot(self.id);
            }
        }
        let context = Arc::clone(&self.context);
        run_or_post(&*self.delivery, move || {
            release::discard(&context, cached);
            if let Some(observer) = observer {
                observer.on_reset();
            }
        });
        log_debug!(slot = self.id, "slot torn down");
    }
}

/// Clears the in-progress mark of a delivery, also when the observer panics.
struct Delivering<'a, D>(&'a Slot<D>);

impl<D> Drop for Delivering<'_, D> {
    fn drop(&mut self) {
        self.0
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .delivering = false;
        self.0.idle.notify_all();
    }
}

impl<D: Payload> ErasedSlot for Slot<D> {
    fn id(&self) -> SlotId {
        self.id
    }

    fn tear_down(&self) {
        Slot::tear_down(self);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// The observer a slot subscribes to each execution it starts.
struct Relay<D> {
    slot: Weak<Slot<D>>,
    generation: u64,
}

impl<D: Payload> Relay<D> {
    fn forward(&self, outcome: Outcome<D>) {
        let Some(slot) = self.slot.upgrade() else {
            return;
        };
        let generation = self.generation;
        let delivery = Arc::clone(&slot.delivery);
        run_or_post(&*delivery, move || slot.settle(generation, outcome));
    }
}

impl<D: Payload> Observer<D> for Relay<D> {
    fn on_result(&self, data: Arc<D>) {
        self.forward(Outcome::Data(data));
    }

    fn on_error(&self, error: AsyncError) {
        self.forward(Outcome::Error(error));
    }
}
