//! In-process transport for offline use and demos
//!
//! Reports a roster built from seed contacts, marks the session ready, and
//! answers every delivered message with an echo from the recipient.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{debug, info};

use super::{EventSender, Transport, TransportEvent};
use crate::errors::{TransportError, TransportResult};
use crate::types::{Address, Contact, PresenceStatus, Subscription};

const LOOPBACK_RESOURCE: &str = "loopback";

#[derive(Debug, Default)]
struct LoopbackState {
    events: Option<EventSender>,
    contacts: IndexMap<Address, Contact>,
}

#[derive(Debug)]
pub struct LoopbackTransport {
    local: Address,
    state: Mutex<LoopbackState>,
}

impl LoopbackTransport {
    pub fn new(local: Address, seed: Vec<Contact>) -> Self {
        let contacts = seed
            .into_iter()
            .filter(|contact| contact.address != local)
            .map(|contact| (contact.address.clone(), contact))
            .collect();
        Self {
            local,
            state: Mutex::new(LoopbackState {
                events: None,
                contacts,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(state: &LoopbackState, event: TransportEvent) -> TransportResult<()> {
        let events = state.events.as_ref().ok_or(TransportError::NotConnected)?;
        events.send(event).map_err(|_| TransportError::Shutdown {
            reason: "event receiver dropped".to_string(),
        })
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn connect(&self, events: EventSender) -> TransportResult<()> {
        let mut state = self.state();
        state.events = Some(events);
        info!("loopback session for {}", self.local);

        let snapshot: Vec<Contact> = state
            .contacts
            .values()
            .map(|contact| Contact {
                resources: IndexMap::new(),
                ..contact.clone()
            })
            .collect();
        Self::emit(&state, TransportEvent::RosterSnapshot { contacts: snapshot })?;

        for contact in state.contacts.values() {
            for (resource, status) in &contact.resources {
                Self::emit(
                    &state,
                    TransportEvent::PresenceChanged {
                        address: contact.address.clone(),
                        resource: resource.clone(),
                        status: *status,
                    },
                )?;
            }
        }
        Self::emit(&state, TransportEvent::SessionReady)
    }

    async fn disconnect(&self) -> TransportResult<()> {
        let mut state = self.state();
        if state.events.take().is_some() {
            info!("loopback session closed");
        }
        Ok(())
    }

    async fn send_message(&self, to: &Address, body: &str) -> TransportResult<()> {
        let state = self.state();
        if state.events.is_none() {
            return Err(TransportError::NotConnected);
        }
        if !state.contacts.contains_key(to) {
            return Err(TransportError::UnknownContact { address: to.clone() });
        }
        debug!("loopback delivering {} bytes to {}", body.len(), to);
        Self::emit(
            &state,
            TransportEvent::MessageReceived {
                from: to.clone(),
                body: body.to_string(),
            },
        )
    }

    async fn set_name(&self, address: &Address, name: &str) -> TransportResult<()> {
        let mut state = self.state();
        if state.events.is_none() {
            return Err(TransportError::NotConnected);
        }
        state
            .contacts
            .entry(address.clone())
            .or_insert_with(|| Contact::new(address.clone(), ""))
            .display_name = name.to_string();
        Ok(())
    }

    async fn add_contact(&self, address: &Address) -> TransportResult<()> {
        if *address == self.local {
            return Err(TransportError::RosterRejected {
                reason: "cannot add own account".to_string(),
            });
        }
        let mut state = self.state();
        if state.events.is_none() {
            return Err(TransportError::NotConnected);
        }
        let contact = state
            .contacts
            .entry(address.clone())
            .or_insert_with(|| Contact::new(address.clone(), ""));
        contact.subscription = Subscription::Both;
        contact.set_presence(LOOPBACK_RESOURCE.to_string(), PresenceStatus::Available);
        let accepted = Contact {
            resources: IndexMap::new(),
            ..contact.clone()
        };

        // Subscription is granted immediately
        Self::emit(&state, TransportEvent::RosterItem { contact: accepted })?;
        Self::emit(
            &state,
            TransportEvent::PresenceChanged {
                address: address.clone(),
                resource: LOOPBACK_RESOURCE.to_string(),
                status: PresenceStatus::Available,
            },
        )
    }

    async fn remove_contact(&self, address: &Address) -> TransportResult<()> {
        let mut state = self.state();
        if state.events.is_none() {
            return Err(TransportError::NotConnected);
        }
        state
            .contacts
            .shift_remove(address)
            .map(|_| ())
            .ok_or_else(|| TransportError::UnknownContact {
                address: address.clone(),
            })
    }
}
