use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

pub enum TaskPoll<T> {
    Pending,
    Ready(T),
    /// The worker ended without delivering (panicked or never started).
    Lost,
}

/// A blocking job on its own thread whose single result arrives over a channel.
///
/// Dropping the task abandons the result: the worker still runs to completion
/// but its send fails and the value is discarded.
pub struct PendingTask<T> {
    rx: Receiver<T>,
}

impl<T: Send + 'static> PendingTask<T> {
    pub fn spawn<F>(name: &str, job: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(format!("examdr-{name}"))
            .spawn(move || {
                let _ = tx.send(job());
            });
        if let Err(e) = spawned {
            tracing::error!(task = name, "could not start worker thread: {e}");
        }
        Self { rx }
    }

    pub fn poll(&self) -> TaskPoll<T> {
        match self.rx.try_recv() {
            Ok(value) => TaskPoll::Ready(value),
            Err(TryRecvError::Empty) => TaskPoll::Pending,
            Err(TryRecvError::Disconnected) => TaskPoll::Lost,
        }
    }

    /// Block until the result arrives or `timeout` passes.
    pub fn wait(self, timeout: Duration) -> TaskPoll<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => TaskPoll::Ready(value),
            Err(RecvTimeoutError::Timeout) => TaskPoll::Pending,
            Err(RecvTimeoutError::Disconnected) => TaskPoll::Lost,
        }
    }
}
