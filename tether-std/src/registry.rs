//! # Context Registry
//!
//! An explicit table from a request type to the constructor of the
//! [`DeliveryContext`] that serves it. Built once by whoever owns the
//! operations and passed to the code that needs them; there is no global
//! state and no runtime type discovery.
//!
//! # Example
//!
//! ```rust,ignore
//! struct UserById(u64);
//!
//! let registry = ContextRegistry::builder()
//!     .register(|UserById(id): UserById| {
//!         DeliveryContext::direct(move || Task::new(move |_| load_user(id)).boxed())
//!     })?
//!     .build();
//!
//! let load = registry.load::<_, User>(host, USER_SLOT, UserById(7))?;
//! ```

use crate::{context::DeliveryContext, host::SharedHost, load::LoadAsync};
use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    sync::Arc,
};
use tether_core::{Payload, RegistryError, SlotId};

type Factory<R, D> = Arc<dyn Fn(R) -> DeliveryContext<D> + Send + Sync>;
type Key = (TypeId, TypeId);

/// Maps request types to context constructors.
pub struct ContextRegistry {
    factories: HashMap<Key, Box<dyn Any + Send + Sync>>,
}

impl ContextRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Build the context registered for `R`.
    pub fn context<R: 'static, D: Payload>(
        &self,
        request: R,
    ) -> Result<DeliveryContext<D>, RegistryError> {
        let factory = self
            .factories
            .get(&key::<R, D>())
            .and_then(|entry| entry.downcast_ref::<Factory<R, D>>())
            .ok_or(RegistryError::NotRegistered(type_name::<R>()))?;
        Ok(factory(request))
    }

    /// Build a [`LoadAsync`] for slot `id` serving `request`.
    pub fn load<R: 'static, D: Payload>(
        &self,
        host: SharedHost,
        id: SlotId,
        request: R,
    ) -> Result<LoadAsync<D>, RegistryError> {
        Ok(LoadAsync::new(host, id, self.context(request)?))
    }

    /// Returns `true` if `R` has a constructor for payload `D`.
    pub fn contains<R: 'static, D: Payload>(&self) -> bool {
        self.factories.contains_key(&key::<R, D>())
    }

    /// Number of registered constructors.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Builder for a [`ContextRegistry`].
pub struct RegistryBuilder {
    factories: HashMap<Key, Box<dyn Any + Send + Sync>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register the constructor for request type `R`.
    pub fn register<R, D, F>(mut self, factory: F) -> Result<Self, RegistryError>
    where
        R: 'static,
        D: Payload,
        F: Fn(R) -> DeliveryContext<D> + Send + Sync + 'static,
    {
        let key = key::<R, D>();
        if self.factories.contains_key(&key) {
            return Err(RegistryError::Duplicate(type_name::<R>()));
        }
        let factory: Factory<R, D> = Arc::new(factory);
        self.factories.insert(key, Box::new(factory));
        Ok(self)
    }

    /// Fold in every [`Registration`] submitted through `inventory`.
    #[cfg(feature = "inventory")]
    pub fn with_collected(mut self) -> Result<Self, RegistryError> {
        for registration in inventory::iter::<Registration> {
            log_debug!(name = registration.name, "collected registration");
            self = (registration.register)(self)?;
        }
        Ok(self)
    }

    /// Build the registry.
    pub fn build(self) -> ContextRegistry {
        ContextRegistry {
            factories: self.factories,
        }
    }
}

/// A link-time registration, submitted with `inventory::submit!`.
///
/// ```rust,ignore
/// inventory::submit! {
///     Registration::new("users", |builder| builder.register(user_context))
/// }
/// ```
#[cfg(feature = "inventory")]
pub struct Registration {
    /// Name for debugging.
    pub name: &'static str,
    /// Adds the constructors of this registration to a builder.
    pub register: fn(RegistryBuilder) -> Result<RegistryBuilder, RegistryError>,
}

#[cfg(feature = "inventory")]
impl Registration {
    /// Create a registration entry.
    pub const fn new(
        name: &'static str,
        register: fn(RegistryBuilder) -> Result<RegistryBuilder, RegistryError>,
    ) -> Self {
        Self { name, register }
    }
}

#[cfg(feature = "inventory")]
inventory::collect!(Registration);

fn key<R: 'static, D: 'static>() -> Key {
    (TypeId::of::<R>(), TypeId::of::<D>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        executor::ManualExecutor,
        host::SlotMap,
        task::Ready,
        testing::{Event, RecordingObserver},
    };
    use tether_core::{AsyncResult, BoxAsync};

    struct Square(u32);
    struct Echo(String);

    fn registry() -> ContextRegistry {
        ContextRegistry::builder()
            .register(|Square(n): Square| {
                DeliveryContext::direct(move || -> BoxAsync<u32> { Ready::ok(n * n).boxed() })
            })
            .unwrap()
            .register(|Echo(s): Echo| {
                DeliveryContext::direct(move || -> BoxAsync<String> { Ready::ok(s.clone()).boxed() })
            })
            .unwrap()
            .build()
    }

    #[test]
    fn test_lookup_by_request_type() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains::<Square, u32>());
        assert!(!registry.contains::<Square, String>());

        let host = Arc::new(SlotMap::new(Arc::new(ManualExecutor::new())));
        let load = registry.load::<_, u32>(host, 1, Square(12)).unwrap();
        let observer = RecordingObserver::new();
        load.subscribe(observer.shared()).unwrap();
        assert_eq!(observer.events(), vec![Event::result(144)]);
    }

    #[test]
    fn test_missing_registration() {
        let registry = registry();
        let err = registry.context::<Square, String>(Square(1)).err();
        assert!(matches!(err, Some(RegistryError::NotRegistered(_))));
    }

    #[test]
    fn test_duplicate_registration() {
        let err = ContextRegistry::builder()
            .register(|Square(n): Square| {
                DeliveryContext::direct(move || -> BoxAsync<u32> { Ready::ok(n).boxed() })
            })
            .unwrap()
            .register(|Square(n): Square| {
                DeliveryContext::direct(move || -> BoxAsync<u32> { Ready::ok(n + 1).boxed() })
            })
            .err();
        assert!(matches!(err, Some(RegistryError::Duplicate(_))));
    }
}
