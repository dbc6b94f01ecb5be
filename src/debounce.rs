//! Last-write-wins debouncing of values pushed from request handlers.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Accepts values at any rate and emits only the latest one once `delay` has
/// passed without a newer push.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Must be called from within a tokio runtime.
    pub fn spawn(delay: Duration) -> (Self, mpsc::Receiver<T>) {
        let (input, mut pending) = mpsc::unbounded_channel::<T>();
        let (output, settled) = mpsc::channel::<T>(16);

        let task = tokio::spawn(async move {
            while let Some(mut latest) = pending.recv().await {
                let mut superseded = 0usize;
                loop {
                    tokio::select! {
                        next = pending.recv() => match next {
                            Some(value) => {
                                latest = value;
                                superseded += 1;
                            }
                            // Input closed mid-wait: the pending value is dropped.
                            None => return,
                        },
                        _ = tokio::time::sleep(delay) => break,
                    }
                }
                debug!(superseded, "Debounce window closed");
                if output.send(latest).await.is_err() {
                    return;
                }
            }
        });

        (Debouncer { input, task }, settled)
    }

    pub fn push(&self, value: T) {
        if self.input.send(value).is_err() {
            warn!("Debouncer task has stopped; dropping value");
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
