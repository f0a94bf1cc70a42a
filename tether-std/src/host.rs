//! # Host Container
//!
//! The long-lived owner of slots. A host outlives the consumers that attach to
//! its slots (a consumer may be torn down and recreated any number of times)
//! and is the only place a slot can be found again by id.
//!
//! All host operations are expected on the delivery thread.

use std::{
    any::Any,
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};
use tether_core::{Executor, SlotId};

/// A slot with its payload type erased, as stored by a host.
pub trait ErasedSlot: Send + Sync + 'static {
    /// The id the slot is stored under.
    fn id(&self) -> SlotId;

    /// Tear the slot down. Idempotent.
    fn tear_down(&self);

    /// Recover the concrete slot type.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A container of slots keyed by id.
pub trait HostContainer: Send + Sync + 'static {
    /// Look up a slot.
    fn get_slot(&self, id: SlotId) -> Option<Arc<dyn ErasedSlot>>;

    /// Store a slot.
    fn put_slot(&self, id: SlotId, slot: Arc<dyn ErasedSlot>);

    /// Remove a slot and tear it down. Idempotent.
    fn destroy_slot(&self, id: SlotId);

    /// The delivery thread every slot of this host delivers on.
    fn delivery(&self) -> Arc<dyn Executor>;
}

/// A shared, type-erased host.
pub type SharedHost = Arc<dyn HostContainer>;

/// An in-memory [`HostContainer`].
pub struct SlotMap {
    slots: Mutex<HashMap<SlotId, Arc<dyn ErasedSlot>>>,
    delivery: Arc<dyn Executor>,
    destroyed: AtomicBool,
}

impl SlotMap {
    /// Create an empty host delivering on `delivery`.
    pub fn new<X: Executor>(delivery: Arc<X>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            delivery,
            destroyed: AtomicBool::new(false),
        }
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no slot is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a slot is stored under `id`.
    pub fn contains(&self, id: SlotId) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Destroy the host: tear down every slot. Slots stored afterwards are
    /// torn down immediately.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        let slots: Vec<_> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        log_debug!(count = slots.len(), "host destroyed");
        for slot in slots {
            slot.tear_down();
        }
    }

    /// Returns `true` once [`destroy`](Self::destroy) ran.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

impl HostContainer for SlotMap {
    fn get_slot(&self, id: SlotId) -> Option<Arc<dyn ErasedSlot>> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn put_slot(&self, id: SlotId, slot: Arc<dyn ErasedSlot>) {
        if self.is_destroyed() {
            slot.tear_down();
            return;
        }
        let replaced = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, slot);
        if let Some(replaced) = replaced {
            log_warn!(slot = id, "slot replaced while live");
            replaced.tear_down();
        }
    }

    fn destroy_slot(&self, id: SlotId) {
        let removed = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(slot) = removed {
            slot.tear_down();
        }
    }

    fn delivery(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.delivery)
    }
}
