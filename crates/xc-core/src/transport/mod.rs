//! Transport seam
//!
//! The protocol session (connection, authentication, stanza encoding) lives
//! behind the [`Transport`] trait. Everything it reports flows back as a
//! closed set of [`TransportEvent`] values on one channel, consumed in order
//! by a single event pump.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::TransportResult;
use crate::types::{Address, Contact, PresenceStatus};

pub mod loopback;

pub use loopback::LoopbackTransport;

// ----------------------------------------------------------------------------
// Events: Transport → Session
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportEvent {
    /// Session established; the console may open its prompt
    SessionReady,
    /// Session could not be established (authentication, trust, connection)
    SessionFailed { reason: String },
    /// Initial or refreshed contact list
    RosterSnapshot { contacts: Vec<Contact> },
    /// A single roster entry was added or changed remotely
    RosterItem { contact: Contact },
    /// A roster entry was removed remotely
    RosterRemoved { address: Address },
    PresenceChanged {
        address: Address,
        resource: String,
        status: PresenceStatus,
    },
    MessageReceived { from: Address, body: String },
    /// Connection lost after the session was established
    Disconnected { reason: String },
}

pub type EventSender = mpsc::UnboundedSender<TransportEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Create the channel a transport reports its events on
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

// ----------------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------------

#[async_trait]
pub trait Transport: Send + Sync {
    /// Start the session; progress and failures are reported through `events`
    async fn connect(&self, events: EventSender) -> TransportResult<()>;

    async fn disconnect(&self) -> TransportResult<()>;

    /// Send a chat message, resolving once the server acknowledged it
    async fn send_message(&self, to: &Address, body: &str) -> TransportResult<()>;

    async fn set_name(&self, address: &Address, name: &str) -> TransportResult<()>;

    /// Add a roster entry and request a presence subscription
    async fn add_contact(&self, address: &Address) -> TransportResult<()>;

    async fn remove_contact(&self, address: &Address) -> TransportResult<()>;
}
