//! Release hooks for values that hold external resources.

use crate::error::BoxError;

/// Frees whatever a delivered value holds (open files, cursors, buffers).
///
/// Called exactly once per value, after the value stopped being the cached
/// result of its slot. An error is logged by the caller and otherwise ignored.
pub trait Releaser<D>: Send + Sync + 'static {
    /// Release the resources held by `data`.
    fn release(&self, data: &D) -> Result<(), BoxError>;
}

impl<D, F> Releaser<D> for F
where
    F: Fn(&D) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn release(&self, data: &D) -> Result<(), BoxError> {
        (self)(data)
    }
}
