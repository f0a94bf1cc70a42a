//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver},
    },
    time::Duration,
};
use tether::{FnObserver, SharedHost, SharedObserver, SlotMap, executor::ManualExecutor};

/// How long a threaded test waits for a delivery.
pub const WAIT: Duration = Duration::from_secs(5);

/// A host driven from the test thread.
pub struct ManualHost {
    pub delivery: Arc<ManualExecutor>,
    pub host: Arc<SlotMap>,
}

impl ManualHost {
    pub fn new() -> Self {
        let delivery = Arc::new(ManualExecutor::new());
        let host = Arc::new(SlotMap::new(delivery.clone()));
        Self { delivery, host }
    }

    pub fn shared(&self) -> SharedHost {
        self.host.clone()
    }
}

/// An observer that forwards every outcome into a channel.
pub fn channel_observer<D>() -> (SharedObserver<D>, Receiver<Result<Arc<D>, String>>)
where
    D: Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel();
    let err_tx = tx.clone();
    let observer = FnObserver::new(
        move |data: Arc<D>| {
            let _ = tx.send(Ok(data));
        },
        move |error: tether::AsyncError| {
            let _ = err_tx.send(Err(error.to_string()));
        },
    );
    (Arc::new(observer), rx)
}
