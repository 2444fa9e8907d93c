//! One-shot background job owning its result buffer.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};

/// Handle to in-flight work producing a `T`.
///
/// Dropping the handle without completing it detaches the worker; the
/// result is discarded when the worker finishes.
#[derive(Debug)]
pub struct PendingJob<T> {
    label: &'static str,
    receiver: Receiver<T>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> PendingJob<T> {
    /// Runs `work` on a background thread.
    pub fn spawn<F>(label: &'static str, work: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        let worker = thread::spawn(move || {
            // The receiver may be gone if the handle was dropped.
            let _ = sender.send(work());
        });

        Self {
            label,
            receiver,
            worker: Some(worker),
        }
    }

    /// Wraps an already computed value.
    #[must_use]
    pub fn completed(label: &'static str, value: T) -> Self {
        let (sender, receiver) = bounded(1);
        let _ = sender.send(value);
        Self {
            label,
            receiver,
            worker: None,
        }
    }

    /// Name given at spawn time.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Checks if the result is ready without blocking.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Blocks until the work is done and returns its result.
    ///
    /// # Panics
    ///
    /// Re-raises the worker's panic, if it panicked.
    pub fn complete(mut self) -> T {
        let result = self.receiver.recv();
        if let Some(worker) = self.worker.take() {
            if let Err(payload) = worker.join() {
                std::panic::resume_unwind(payload);
            }
        }

        match result {
            Ok(value) => {
                tracing::trace!(job = self.label, "job completed");
                value
            }
            Err(_) => panic!("Job '{}' finished without a result", self.label),
        }
    }
}
