//! One-shot startup gate between the transport's event side and the console
//!
//! The event side holds a [`ReadySignal`] and resolves it once the session is
//! established (or has definitively failed). The console holds the single
//! [`ReadyWait`] and consumes it before showing the first prompt. Only the first
//! resolution counts; later calls are ignored.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::StartupError;

type Outcome = std::result::Result<(), String>;

/// Factory for the signal/wait pair
pub struct StartupGate;

impl StartupGate {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (ReadySignal, ReadyWait) {
        let (tx, rx) = oneshot::channel();
        (
            ReadySignal {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            ReadyWait { receiver: rx },
        )
    }
}

/// Event-side half of the gate
#[derive(Debug, Clone)]
pub struct ReadySignal {
    sender: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl ReadySignal {
    /// Release the waiter with success. Returns `false` if already resolved.
    pub fn signal_ready(&self) -> bool {
        self.resolve(Ok(()))
    }

    /// Release the waiter with a fatal startup failure
    pub fn signal_failed(&self, reason: impl Into<String>) -> bool {
        self.resolve(Err(reason.into()))
    }

    pub fn is_resolved(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn resolve(&self, outcome: Outcome) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => {
                debug!("startup gate resolved: {:?}", outcome);
                // The waiter may already have given up on a timeout
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

/// Console-side half of the gate; consumed by the single wait
#[derive(Debug)]
pub struct ReadyWait {
    receiver: oneshot::Receiver<Outcome>,
}

impl ReadyWait {
    /// Suspend until the session is ready, failed, or `timeout` elapses
    pub async fn wait(self, timeout: Duration) -> Result<(), StartupError> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Err(_) => Err(StartupError::TimedOut(timeout)),
            Ok(Err(_)) => Err(StartupError::Abandoned),
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(StartupError::Failed(reason)),
        }
    }
}
