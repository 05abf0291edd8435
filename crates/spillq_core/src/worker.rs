//! Background persist worker.
//!
//! Each queue owns one worker thread. An enqueue that needs heap relief
//! hands a job to the worker and waits for it with a timeout. Jobs run one
//! at a time, in submission order.
//!
//! A job whose caller gave up waiting is skipped if it has not started yet.
//! A job already running is never interrupted; its effects still apply and
//! its result is dropped.
//!
//! A panicking job is caught and reported to its caller as `JobPanicked`;
//! the thread goes on serving later jobs.

use crate::error::{QueueError, QueueResult};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A job plus the flag its caller sets when it stops waiting.
struct Task {
    job: Job,
    cancelled: Arc<AtomicBool>,
}

/// Single-threaded executor for persist jobs.
#[derive(Debug)]
pub(crate) struct PersistWorker {
    sender: Option<Sender<Task>>,
    handle: Option<JoinHandle<()>>,
}

impl PersistWorker {
    /// Starts the worker thread for the named queue.
    pub(crate) fn spawn(queue_name: &str) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Task>();
        let handle = thread::Builder::new()
            .name(format!("spillq-persist-{queue_name}"))
            .spawn(move || {
                tracing::trace!("persist worker started");
                while let Ok(task) = receiver.recv() {
                    if task.cancelled.load(Ordering::SeqCst) {
                        tracing::trace!("skipping persist job abandoned by its caller");
                        continue;
                    }
                    (task.job)();
                }
                tracing::trace!("persist worker stopped");
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Runs `job` on the worker and waits up to `timeout` for its result.
    ///
    /// Returns `Ok(None)` if the wait timed out.
    ///
    /// # Errors
    ///
    /// - `JobPanicked` if the job panicked
    /// - `WorkerStopped` if the worker thread is gone
    pub(crate) fn run_with_timeout<R, F>(&self, timeout: Duration, job: F) -> QueueResult<Option<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(QueueError::WorkerStopped)?;
        let (reply_tx, reply_rx) = mpsc::sync_channel::<Result<R, String>>(1);
        let cancelled = Arc::new(AtomicBool::new(false));

        let task = Task {
            job: Box::new(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(panic_message = %message, "persist job panicked");
                    message
                });
                // The caller may have stopped listening.
                let _ = reply_tx.send(outcome);
            }),
            cancelled: Arc::clone(&cancelled),
        };
        sender.send(task).map_err(|_| QueueError::WorkerStopped)?;

        match reply_rx.recv_timeout(timeout) {
            Ok(Ok(result)) => Ok(Some(result)),
            Ok(Err(message)) => Err(QueueError::JobPanicked { message }),
            Err(RecvTimeoutError::Timeout) => {
                cancelled.store(true, Ordering::SeqCst);
                Ok(None)
            }
            Err(RecvTimeoutError::Disconnected) => Err(QueueError::WorkerStopped),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

impl Drop for PersistWorker {
    fn drop(&mut self) {
        // Closing the channel ends the receive loop.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("persist worker panicked");
            }
        }
    }
}
