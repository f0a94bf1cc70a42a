//! Logging observer for delivery observation.

use std::{fmt::Debug, sync::Arc};
use tether_core::{AsyncError, Observer, Payload};

/// An observer wrapper that logs every callback before forwarding it.
pub struct LoggingObserver<O> {
    inner: O,
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    name: &'static str,
}

impl<O> LoggingObserver<O> {
    /// Wrap `inner`, tagging its log lines with `name`.
    pub const fn new(inner: O, name: &'static str) -> Self {
        Self { inner, name }
    }

    /// Get a reference to the wrapped observer.
    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<D, O> Observer<D> for LoggingObserver<O>
where
    D: Payload + Debug,
    O: Observer<D>,
{
    fn on_result(&self, data: Arc<D>) {
        #[cfg(feature = "tracing")]
        {
            tracing::info!(observer = %self.name, ?data, "result delivered");
        }
        self.inner.on_result(data);
    }

    fn on_error(&self, error: AsyncError) {
        #[cfg(feature = "tracing")]
        {
            tracing::info!(observer = %self.name, %error, "error delivered");
        }
        self.inner.on_error(error);
    }

    fn on_reset(&self) {
        #[cfg(feature = "tracing")]
        {
            tracing::info!(observer = %self.name, "observer reset");
        }
        self.inner.on_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, RecordingObserver};

    #[test]
    fn test_logging_observer_forwards() {
        let recorder = RecordingObserver::<u32>::new();
        let observer = LoggingObserver::new(recorder.clone(), "test_observer");
        observer.on_result(Arc::new(1));
        observer.on_error(AsyncError::msg("bad"));
        observer.on_reset();
        assert_eq!(
            recorder.events(),
            vec![Event::result(1), Event::Error("bad".into()), Event::Reset]
        );
        assert_eq!(observer.inner().count(), 3);
    }
}
