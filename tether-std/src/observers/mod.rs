//! Standard observer implementations.

pub mod logging;

pub use logging::LoggingObserver;
