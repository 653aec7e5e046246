//! Core roster types: addresses, presence and subscription state

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ----------------------------------------------------------------------------
// Address
// ----------------------------------------------------------------------------

/// Bare account address of a contact, e.g. `user@domain`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Split a full address (`user@domain/resource`) into its bare address and resource
    pub fn split_full(full: &str) -> (Self, Option<String>) {
        match full.split_once('/') {
            Some((bare, resource)) => (Self::new(bare), Some(resource.to_string())),
            None => (Self::new(full), None),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ----------------------------------------------------------------------------
// Presence
// ----------------------------------------------------------------------------

/// Presence status reported for one resource of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceStatus {
    Available,
    Chat,
    Away,
    ExtendedAway,
    DoNotDisturb,
    Offline,
}

impl PresenceStatus {
    /// Single-character marker used in roster listings
    pub fn glyph(&self) -> char {
        match self {
            PresenceStatus::Away => 'a',
            PresenceStatus::ExtendedAway => 'x',
            PresenceStatus::DoNotDisturb => 'd',
            _ => '*',
        }
    }

    /// Higher is more reachable
    fn rank(&self) -> u8 {
        match self {
            PresenceStatus::Chat => 5,
            PresenceStatus::Available => 4,
            PresenceStatus::Away => 3,
            PresenceStatus::DoNotDisturb => 2,
            PresenceStatus::ExtendedAway => 1,
            PresenceStatus::Offline => 0,
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PresenceStatus::Available => "online",
            PresenceStatus::Chat => "chat",
            PresenceStatus::Away => "away",
            PresenceStatus::ExtendedAway => "xa",
            PresenceStatus::DoNotDisturb => "dnd",
            PresenceStatus::Offline => "offline",
        };
        f.write_str(label)
    }
}

/// Presence subscription relationship with a contact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    #[default]
    None,
    To,
    From,
    Both,
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Subscription::None => "none",
            Subscription::To => "to",
            Subscription::From => "from",
            Subscription::Both => "both",
        };
        f.write_str(label)
    }
}

// ----------------------------------------------------------------------------
// Contact
// ----------------------------------------------------------------------------

/// A roster entry together with its live per-resource presence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub address: Address,
    /// Human-readable label, not guaranteed unique across the roster
    pub display_name: String,
    pub subscription: Subscription,
    /// Resource identifier to status; empty means offline
    #[serde(default)]
    pub resources: IndexMap<String, PresenceStatus>,
}

impl Contact {
    pub fn new(address: impl Into<Address>, display_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.into(),
            subscription: Subscription::None,
            resources: IndexMap::new(),
        }
    }

    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscription = subscription;
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>, status: PresenceStatus) -> Self {
        self.set_presence(resource.into(), status);
        self
    }

    /// Apply one resource presence update; `Offline` drops the resource
    pub fn set_presence(&mut self, resource: String, status: PresenceStatus) {
        if status == PresenceStatus::Offline {
            self.resources.shift_remove(&resource);
        } else {
            self.resources.insert(resource, status);
        }
    }

    pub fn is_online(&self) -> bool {
        !self.resources.is_empty()
    }

    /// Most reachable status across all resources
    pub fn aggregate_status(&self) -> PresenceStatus {
        self.resources
            .values()
            .copied()
            .max_by_key(PresenceStatus::rank)
            .unwrap_or(PresenceStatus::Offline)
    }

    /// One glyph per online resource, empty when offline
    pub fn status_glyphs(&self) -> String {
        self.resources.values().map(PresenceStatus::glyph).collect()
    }

    /// Display name, falling back to the address when unnamed
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            self.address.as_str()
        } else {
            &self.display_name
        }
    }
}
