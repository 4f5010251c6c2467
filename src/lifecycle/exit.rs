//! The exit signal: how background tasks report that they stopped.
//!
//! # Design Decisions
//! - Unbounded channel: reporting never blocks, whatever the number of tasks
//! - Each task reports at most once; `Ok(())` means a clean stop
//! - The caller reads only the first report; the rest stay queued

use thiserror::Error;
use tokio::sync::mpsc;

/// Failure of a background task after the bootstrap returned.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("HTTP serve error: {0}")]
    Http(#[source] std::io::Error),

    #[error("GRPC serve error: {0}")]
    Grpc(#[source] tonic::transport::Error),

    #[error("diagnostics exited: {0}")]
    Diagnostics(String),

    #[error("{name} exited: {message}")]
    Task { name: String, message: String },
}

/// Outcome reported by one background task.
pub type ExitOutcome = Result<(), ServeError>;

/// Write side of the exit signal. Cloned into every background task and
/// registered as a provider.
#[derive(Debug, Clone)]
pub struct ExitReporter {
    tx: mpsc::UnboundedSender<ExitOutcome>,
}

impl ExitReporter {
    /// Report a task outcome. Never blocks; ignored once the reader is gone.
    pub fn report(&self, outcome: ExitOutcome) {
        if self.tx.send(outcome).is_err() {
            tracing::trace!("exit signal reader dropped, outcome discarded");
        }
    }

    /// Report a failure of a user-spawned task.
    pub fn fail(&self, name: impl Into<String>, message: impl Into<String>) {
        self.report(Err(ServeError::Task {
            name: name.into(),
            message: message.into(),
        }));
    }
}

/// Read side of the exit signal.
#[derive(Debug)]
pub struct ExitSignal {
    rx: mpsc::UnboundedReceiver<ExitOutcome>,
}

impl ExitSignal {
    /// Wait for the first reported outcome.
    ///
    /// Resolves to `Ok(())` if every reporter is gone without reporting.
    pub async fn recv(&mut self) -> ExitOutcome {
        self.rx.recv().await.unwrap_or(Ok(()))
    }

    /// Non-blocking check for an outcome.
    pub fn try_recv(&mut self) -> Option<ExitOutcome> {
        self.rx.try_recv().ok()
    }
}

/// Create a connected reporter and signal.
pub fn channel() -> (ExitReporter, ExitSignal) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ExitReporter { tx }, ExitSignal { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_two_writers_one_reader() {
        let (reporter, mut signal) = channel();

        let tasks: Vec<_> = ["grpc", "http"]
            .into_iter()
            .map(|name| {
                let reporter = reporter.clone();
                tokio::spawn(async move { reporter.fail(name, "listener closed") })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(matches!(signal.recv().await, Err(ServeError::Task { .. })));
        // The second failure is not lost, just unread.
        assert!(matches!(signal.try_recv(), Some(Err(_))));
    }

    #[tokio::test]
    async fn test_all_writers_dropped_is_clean() {
        let (reporter, mut signal) = channel();
        drop(reporter);

        assert!(signal.recv().await.is_ok());
    }
}
