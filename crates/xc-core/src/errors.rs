//! Error types for the xc core
//!
//! Transport failures, recipient resolution failures and startup failures
//! are kept apart so the console can tell recoverable errors (rendered at the
//! prompt) from fatal ones (which end the process).

use std::time::Duration;

use crate::types::Address;

/// Failures reported by a transport implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },
    #[error("not connected")]
    NotConnected,
    #[error("message to {to} was not delivered: {reason}")]
    SendRejected { to: Address, reason: String },
    #[error("unknown contact: {address}")]
    UnknownContact { address: Address },
    #[error("roster update rejected: {reason}")]
    RosterRejected { reason: String },
    #[error("transport shutdown: {reason}")]
    Shutdown { reason: String },
}

/// Reasons a typed line could not be turned into a recipient
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No `NAME: ` prefix and no sticky recipient to fall back on
    #[error("recipient: message")]
    NoRecipient,
    #[error("unknown recipient: {0}")]
    UnknownRecipient(String),
}

/// Reasons the session never became ready
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartupError {
    #[error("session failed to start: {0}")]
    Failed(String),
    #[error("session not ready after {0:?}")]
    TimedOut(Duration),
    #[error("transport stopped before the session was ready")]
    Abandoned,
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;
