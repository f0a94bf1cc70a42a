//! The settled state of a unit of work.

use crate::{error::AsyncError, observer::Observer};
use std::{fmt, sync::Arc};

/// What a slot currently holds for a unit of work.
///
/// `Pending` is the explicit "no result yet" state; `Data` and `Error` are the
/// two ways a unit of work settles. Values are held behind an `Arc` so the same
/// allocation can be replayed to every observer that attaches later and
/// compared by identity when it is superseded.
pub enum Outcome<D> {
    /// Nothing has been delivered yet.
    Pending,
    /// The unit of work produced a value.
    Data(Arc<D>),
    /// The unit of work failed.
    Error(AsyncError),
}

impl<D> Outcome<D> {
    /// Wrap a freshly produced value.
    pub fn data(value: D) -> Self {
        Outcome::Data(Arc::new(value))
    }

    /// Returns `true` if nothing has been delivered.
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending)
    }

    /// Borrow the value, if any.
    pub fn value(&self) -> Option<&Arc<D>> {
        match self {
            Outcome::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Borrow the error, if any.
    pub fn error(&self) -> Option<&AsyncError> {
        match self {
            Outcome::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` when both outcomes hold the very same value allocation.
    pub fn same_value(&self, other: &Outcome<D>) -> bool {
        match (self, other) {
            (Outcome::Data(a), Outcome::Data(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<D: 'static> Outcome<D> {
    /// Forward this outcome to an observer. `Pending` delivers nothing.
    pub fn deliver_to(&self, observer: &dyn Observer<D>) {
        match self {
            Outcome::Pending => {}
            Outcome::Data(data) => observer.on_result(Arc::clone(data)),
            Outcome::Error(err) => observer.on_error(err.clone()),
        }
    }
}

impl<D> Clone for Outcome<D> {
    fn clone(&self) -> Self {
        match self {
            Outcome::Pending => Outcome::Pending,
            Outcome::Data(data) => Outcome::Data(Arc::clone(data)),
            Outcome::Error(err) => Outcome::Error(err.clone()),
        }
    }
}

impl<D> Default for Outcome<D> {
    fn default() -> Self {
        Outcome::Pending
    }
}

impl<D> From<Result<D, AsyncError>> for Outcome<D> {
    fn from(result: Result<D, AsyncError>) -> Self {
        match result {
            Ok(value) => Outcome::data(value),
            Err(err) => Outcome::Error(err),
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for Outcome<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pending => f.write_str("Pending"),
            Outcome::Data(data) => f.debug_tuple("Data").field(data).finish(),
            Outcome::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}

impl<D: PartialEq> PartialEq for Outcome<D> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Outcome::Pending, Outcome::Pending) => true,
            (Outcome::Data(a), Outcome::Data(b)) => a == b,
            (Outcome::Error(a), Outcome::Error(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_value_equality() {
        assert_eq!(Outcome::data(42), Outcome::data(42));
        assert_ne!(Outcome::data(42), Outcome::data(43));
        assert_ne!(Outcome::data(42), Outcome::Pending);
        assert_eq!(Outcome::<u8>::Pending, Outcome::Pending);
        assert_eq!(
            Outcome::<u8>::Error(AsyncError::msg("x")),
            Outcome::Error(AsyncError::msg("x"))
        );
    }

    #[test]
    fn test_same_value_is_identity() {
        let a = Outcome::data(String::from("buf"));
        let b = a.clone();
        let c = Outcome::data(String::from("buf"));
        assert!(a.same_value(&b));
        assert!(!a.same_value(&c));
        assert!(!Outcome::<u8>::Pending.same_value(&Outcome::Pending));
    }

    #[test]
    fn test_from_result() {
        let ok: Outcome<u8> = Ok(1).into();
        assert_eq!(ok.value().map(|v| **v), Some(1));
        let err: Outcome<u8> = Err(AsyncError::msg("nope")).into();
        assert_eq!(err.error().map(ToString::to_string).as_deref(), Some("nope"));
    }
}
