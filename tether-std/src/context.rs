//! # Delivery Context
//!
//! Binds a [`Provider`] to the release hook of its payload type and decides
//! when a new execution may be created.
//!
//! - **Direct**: a provider is fixed at construction; a slot starts work as
//!   soon as it needs a result.
//! - **Delegated**: created empty and armed later with
//!   [`set_provider`](DeliveryContext::set_provider). Until then a slot
//!   attached to it stays dormant. Used by "send"-style operations whose
//!   arguments are only known at call time.

use crate::release;
use std::sync::{Arc, Mutex, PoisonError};
use tether_core::{BoxAsync, ContractError, Payload, Provider, Releaser, SharedProvider};

enum Mode<D> {
    Direct(SharedProvider<D>),
    Delegated(Mutex<Option<SharedProvider<D>>>),
}

/// A provider plus the release hook for its values.
pub struct DeliveryContext<D> {
    mode: Mode<D>,
    releaser: Option<Arc<dyn Releaser<D>>>,
}

impl<D: Payload> DeliveryContext<D> {
    /// A context that provides straight from `provider`.
    pub fn direct<P: Provider<D>>(provider: P) -> Self {
        Self {
            mode: Mode::Direct(Arc::new(provider)),
            releaser: None,
        }
    }

    /// A context with no provider until one is set.
    pub fn delegated() -> Self {
        Self {
            mode: Mode::Delegated(Mutex::new(None)),
            releaser: None,
        }
    }

    /// Attach a release hook for delivered values.
    pub fn with_releaser<R: Releaser<D>>(mut self, releaser: R) -> Self {
        self.releaser = Some(Arc::new(releaser));
        self
    }

    /// Returns `true` for delegated contexts.
    pub fn is_delegated(&self) -> bool {
        matches!(self.mode, Mode::Delegated(_))
    }

    /// Arm a delegated context with the provider for the next execution.
    ///
    /// Replaces any provider set earlier.
    pub fn set_provider<P: Provider<D>>(&self, provider: P) -> Result<(), ContractError> {
        match &self.mode {
            Mode::Direct(_) => Err(ContractError::NotDelegated),
            Mode::Delegated(slot) => {
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(provider));
                Ok(())
            }
        }
    }

    /// Returns `true` if [`provide`](Self::provide) would succeed.
    pub fn is_armed(&self) -> bool {
        match &self.mode {
            Mode::Direct(_) => true,
            Mode::Delegated(slot) => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some(),
        }
    }

    /// Create a fresh execution handle.
    pub fn provide(&self) -> Result<BoxAsync<D>, ContractError> {
        match &self.mode {
            Mode::Direct(provider) => Ok(provider.provide()),
            Mode::Delegated(slot) => {
                let provider = slot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
                    .ok_or(ContractError::ProviderNotArmed)?;
                Ok(provider.provide())
            }
        }
    }

    /// Run the release hook on `data`, if there is one.
    ///
    /// Failures of the hook are logged and swallowed.
    pub fn release(&self, data: &D) {
        if let Some(releaser) = &self.releaser {
            release::run_hook(releaser.as_ref(), data);
        }
    }
}
