use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Quiet period used for search boxes.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Forwards only the last value of every burst, once no new value arrived
/// for the configured delay.
///
/// Dropping the `Debouncer` flushes a pending value and closes the output.
#[derive(Debug)]
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debouncing task; settled values arrive on the returned receiver.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input, rx) = mpsc::unbounded_channel();
        let (out, settled) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(delay, rx, out));
        (Self { input, task }, settled)
    }

    /// Offer a new value; restarts the quiet period.
    pub fn push(&self, value: T) {
        if self.input.send(value).is_err() {
            trace!("debouncer output closed");
        }
    }

    /// Close the input and wait until the pending value is delivered.
    pub async fn finish(self) {
        let Self { input, task } = self;
        drop(input);
        if let Err(err) = task.await {
            trace!(error = %err, "debouncer task ended abnormally");
        }
    }
}

async fn run<T>(delay: Duration, mut input: mpsc::UnboundedReceiver<T>, out: mpsc::UnboundedSender<T>) {
    let mut pending: Option<T> = None;
    loop {
        if pending.is_none() {
            match input.recv().await {
                Some(value) => pending = Some(value),
                None => return,
            }
            continue;
        }

        tokio::select! {
            received = input.recv() => match received {
                Some(value) => pending = Some(value),
                None => {
                    if let Some(value) = pending.take() {
                        let _ = out.send(value);
                    }
                    return;
                }
            },
            () = tokio::time::sleep(delay) => {
                if let Some(value) = pending.take()
                    && out.send(value).is_err()
                {
                    return;
                }
            }
        }
    }
}
