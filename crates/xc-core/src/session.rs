//! Session state shared by the event side and the console
//!
//! The roster and the sticky recipient live behind one lock so that event
//! handlers and roster-edit commands are applied in a single order.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::ResolveError;
use crate::resolver::{RecipientResolver, ResolvedTarget};
use crate::roster::RosterStore;
use crate::transport::TransportEvent;
use crate::types::{Address, Contact, PresenceStatus};

/// Something the console should tell the user about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Message { from: String, body: String },
    Presence { address: Address, resource: String, status: PresenceStatus },
    Disconnected { reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Message { from, body } => write!(f, "{}: {}", from, body),
            Notice::Presence { address, resource, status } => {
                write!(f, "{}/{} is now {}", address, resource, status)
            }
            Notice::Disconnected { reason } => write!(f, "disconnected: {}", reason),
        }
    }
}

/// The contact the last message was delivered to
#[derive(Debug, Clone)]
struct Sticky {
    name: String,
    address: Address,
}

#[derive(Debug)]
pub struct Session {
    roster: RosterStore,
    last_recipient: Option<Sticky>,
}

impl Session {
    pub fn new(local: Address) -> Self {
        Self {
            roster: RosterStore::new(local),
            last_recipient: None,
        }
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn last_recipient(&self) -> Option<&str> {
        self.last_recipient.as_ref().map(|sticky| sticky.name.as_str())
    }

    pub fn last_address(&self) -> Option<&Address> {
        self.last_recipient.as_ref().map(|sticky| &sticky.address)
    }

    /// Prompt reflecting the sticky recipient, e.g. `Bob> `
    pub fn prompt(&self) -> String {
        format!("{}> ", self.last_recipient().unwrap_or(""))
    }

    pub fn resolve(&self, line: &str) -> Result<ResolvedTarget, ResolveError> {
        RecipientResolver::new(&self.roster, self.last_recipient()).resolve(line)
    }

    /// Make the target the sticky recipient; call only after the send was acknowledged
    pub fn record_delivery(&mut self, target: &ResolvedTarget) {
        self.last_recipient = Some(Sticky {
            name: target.name.clone(),
            address: target.address.clone(),
        });
    }

    pub fn upsert_contact(&mut self, contact: Contact) {
        self.roster.upsert(contact);
        self.refresh_sticky();
    }

    pub fn rename_contact(&mut self, address: &Address, name: &str) {
        self.roster.rename(address, name);
        self.refresh_sticky();
    }

    pub fn remove_contact(&mut self, address: &Address) -> Option<Contact> {
        let removed = self.roster.remove(address);
        self.refresh_sticky();
        removed
    }

    /// Follow the sticky contact by address: pick up renames, drop it once
    /// the contact is gone or has no name left to address it by
    fn refresh_sticky(&mut self) {
        let current = self
            .last_address()
            .and_then(|address| self.roster.find_by_address(address))
            .map(|contact| contact.display_name.clone());
        match current {
            Some(name) if !name.is_empty() => {
                if let Some(sticky) = self.last_recipient.as_mut() {
                    sticky.name = name;
                }
            }
            _ => self.last_recipient = None,
        }
    }

    /// Apply a transport event, returning what should be shown to the user
    pub fn apply(&mut self, event: &TransportEvent) -> Option<Notice> {
        match event {
            TransportEvent::RosterSnapshot { contacts } => {
                self.roster.replace_all(contacts.clone());
                self.refresh_sticky();
                None
            }
            TransportEvent::RosterItem { contact } => {
                self.upsert_contact(contact.clone());
                None
            }
            TransportEvent::RosterRemoved { address } => {
                self.remove_contact(address);
                None
            }
            TransportEvent::PresenceChanged { address, resource, status } => {
                self.roster
                    .apply_presence(address, resource, *status)
                    .then(|| Notice::Presence {
                        address: address.clone(),
                        resource: resource.clone(),
                        status: *status,
                    })
            }
            TransportEvent::MessageReceived { from, body } => {
                let from = self
                    .roster
                    .find_by_address(from)
                    .map(|contact| contact.label().to_string())
                    .unwrap_or_else(|| from.to_string());
                Some(Notice::Message {
                    from,
                    body: body.clone(),
                })
            }
            TransportEvent::Disconnected { reason } => Some(Notice::Disconnected {
                reason: reason.clone(),
            }),
            TransportEvent::SessionReady | TransportEvent::SessionFailed { .. } => None,
        }
    }
}

/// Cloneable handle to the single session lock
#[derive(Debug, Clone)]
pub struct SharedSession(Arc<Mutex<Session>>);

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// Lock the session; a panic on another holder does not invalidate roster data
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
