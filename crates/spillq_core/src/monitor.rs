//! Periodic logging of a queue's configuration and counters.

use crate::config::QueueConfig;
use crate::stats::QueueStats;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Background thread logging a queue summary at a fixed interval.
///
/// Stops and joins when dropped.
#[derive(Debug)]
pub(crate) struct Monitor {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Starts logging `config` and `stats` every `interval`.
    pub(crate) fn spawn(
        config: QueueConfig,
        stats: Arc<QueueStats>,
        interval: Duration,
    ) -> io::Result<Self> {
        let (shutdown, signal) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(format!("spillq-monitor-{}", config.name))
            .spawn(move || loop {
                match signal.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        tracing::info!(queue = %config.name, "{config}, {stats}");
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
