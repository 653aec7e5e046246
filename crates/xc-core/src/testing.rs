//! Recording transport for tests
//!
//! `MockTransport` records every call, replays scripted events on connect,
//! lets tests inject events afterwards, and can be told to reject sends or
//! roster edits.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::errors::{TransportError, TransportResult};
use crate::transport::{EventSender, Transport, TransportEvent};
use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect,
    Disconnect,
    Send { to: Address, body: String },
    SetName { address: Address, name: String },
    AddContact { address: Address },
    RemoveContact { address: Address },
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<TransportCall>,
    events: Option<EventSender>,
    on_connect: Vec<TransportEvent>,
    send_failure: Option<String>,
    roster_failure: Option<String>,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events replayed, in order, when `connect` is called
    pub fn with_connect_events(events: Vec<TransportEvent>) -> Self {
        let transport = Self::default();
        transport.state().on_connect = events;
        transport
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject every following send with `reason`
    pub fn fail_sends(&self, reason: impl Into<String>) {
        self.state().send_failure = Some(reason.into());
    }

    pub fn accept_sends(&self) {
        self.state().send_failure = None;
    }

    /// Reject every following roster edit with `reason`
    pub fn fail_roster_edits(&self, reason: impl Into<String>) {
        self.state().roster_failure = Some(reason.into());
    }

    /// Deliver an event as if it came from the server; `false` when not connected
    pub fn inject(&self, event: TransportEvent) -> bool {
        self.state()
            .events
            .as_ref()
            .is_some_and(|events| events.send(event).is_ok())
    }

    /// Drop the event sender, as a transport task that died would
    pub fn hang_up(&self) {
        self.state().events = None;
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state().calls.clone()
    }

    pub fn sent_messages(&self) -> Vec<(Address, String)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Send { to, body } => Some((to.clone(), body.clone())),
                _ => None,
            })
            .collect()
    }

    fn record_roster_edit(&self, call: TransportCall) -> TransportResult<()> {
        let mut state = self.state();
        state.calls.push(call);
        match &state.roster_failure {
            Some(reason) => Err(TransportError::RosterRejected {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, events: EventSender) -> TransportResult<()> {
        let mut state = self.state();
        state.calls.push(TransportCall::Connect);
        for event in state.on_connect.drain(..) {
            let _ = events.send(event);
        }
        state.events = Some(events);
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        let mut state = self.state();
        state.calls.push(TransportCall::Disconnect);
        state.events = None;
        Ok(())
    }

    async fn send_message(&self, to: &Address, body: &str) -> TransportResult<()> {
        let mut state = self.state();
        state.calls.push(TransportCall::Send {
            to: to.clone(),
            body: body.to_string(),
        });
        match &state.send_failure {
            Some(reason) => Err(TransportError::SendRejected {
                to: to.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn set_name(&self, address: &Address, name: &str) -> TransportResult<()> {
        self.record_roster_edit(TransportCall::SetName {
            address: address.clone(),
            name: name.to_string(),
        })
    }

    async fn add_contact(&self, address: &Address) -> TransportResult<()> {
        self.record_roster_edit(TransportCall::AddContact {
            address: address.clone(),
        })
    }

    async fn remove_contact(&self, address: &Address) -> TransportResult<()> {
        self.record_roster_edit(TransportCall::RemoveContact {
            address: address.clone(),
        })
    }
}
