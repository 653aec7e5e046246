//! Roster store
//!
//! Holds every known contact keyed by bare address, in insertion order.
//! The store performs no I/O and emits no notifications; callers decide what
//! to render after a mutation. The local account never appears in listings
//! or lookups.

use indexmap::IndexMap;
use serde::Serialize;

use crate::types::{Address, Contact, PresenceStatus};

#[derive(Debug, Clone, Serialize)]
pub struct RosterStore {
    local: Address,
    contacts: IndexMap<Address, Contact>,
}

impl RosterStore {
    /// Create an empty roster for the given local account
    pub fn new(local: Address) -> Self {
        Self {
            local,
            contacts: IndexMap::new(),
        }
    }

    pub fn local_address(&self) -> &Address {
        &self.local
    }

    /// Insert or replace a contact by address, presence included
    pub fn upsert(&mut self, contact: Contact) {
        if contact.address == self.local {
            return;
        }
        self.contacts.insert(contact.address.clone(), contact);
    }

    /// Replace the whole roster with a fresh snapshot
    pub fn replace_all(&mut self, snapshot: Vec<Contact>) {
        self.contacts.clear();
        for contact in snapshot {
            self.upsert(contact);
        }
    }

    /// Mutate only the resource map of a contact, creating it when unseen.
    ///
    /// Returns `false` when the update concerns the local account and was ignored.
    pub fn apply_presence(
        &mut self,
        address: &Address,
        resource: &str,
        status: PresenceStatus,
    ) -> bool {
        if *address == self.local {
            return false;
        }
        self.contacts
            .entry(address.clone())
            .or_insert_with(|| Contact::new(address.clone(), ""))
            .set_presence(resource.to_string(), status);
        true
    }

    /// Set a contact's display name, creating the entry when unseen
    pub fn rename(&mut self, address: &Address, name: &str) {
        if *address == self.local {
            return;
        }
        self.contacts
            .entry(address.clone())
            .or_insert_with(|| Contact::new(address.clone(), ""))
            .display_name = name.to_string();
    }

    pub fn remove(&mut self, address: &Address) -> Option<Contact> {
        self.contacts.shift_remove(address)
    }

    /// All contacts except the local account, in insertion order
    pub fn all(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values().filter(|c| c.address != self.local)
    }

    /// Address of the first contact carrying `name`.
    ///
    /// Display names are not unique; the earliest inserted match wins.
    pub fn find_by_display_name(&self, name: &str) -> Option<&Address> {
        if name.is_empty() {
            return None;
        }
        self.all()
            .find(|contact| contact.display_name == name)
            .map(|contact| &contact.address)
    }

    pub fn find_by_address(&self, address: &Address) -> Option<&Contact> {
        if *address == self.local {
            return None;
        }
        self.contacts.get(address)
    }

    /// Display names starting with `prefix`, used by tab completion
    pub fn names_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.all()
            .map(|contact| contact.display_name.as_str())
            .filter(move |name| !name.is_empty() && name.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.all().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn local() -> Address {
        Address::new("me@example.com")
    }

    #[test]
    fn test_upsert_replaces_by_address() {
        let mut roster = RosterStore::new(local());
        roster.upsert(
            Contact::new("bob@example.com", "Bob").with_resource("pc", PresenceStatus::Available),
        );
        roster.upsert(Contact::new("bob@example.com", "Robert"));

        assert_eq!(roster.len(), 1);
        let bob = roster.find_by_address(&"bob@example.com".into()).unwrap();
        assert_eq!(bob.display_name, "Robert");
        assert!(!bob.is_online());
    }

    #[test]
    fn test_presence_creates_unseen_contact_and_keeps_name() {
        let mut roster = RosterStore::new(local());
        let bob = Address::new("bob@example.com");
        assert!(roster.apply_presence(&bob, "pc", PresenceStatus::Away));
        roster.rename(&bob, "Bob");
        roster.apply_presence(&bob, "phone", PresenceStatus::Available);

        let contact = roster.find_by_address(&bob).unwrap();
        assert_eq!(contact.display_name, "Bob");
        assert_eq!(contact.resources.len(), 2);
    }

    #[test]
    fn test_local_presence_ignored() {
        let mut roster = RosterStore::new(local());
        assert!(!roster.apply_presence(&local(), "other-device", PresenceStatus::Available));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_duplicate_names_first_inserted_wins() {
        let mut roster = RosterStore::new(local());
        roster.upsert(Contact::new("bob1@example.com", "Bob"));
        roster.upsert(Contact::new("bob2@example.com", "Bob"));

        assert_eq!(
            roster.find_by_display_name("Bob").map(Address::as_str),
            Some("bob1@example.com")
        );
    }

    #[test]
    fn test_replace_all_is_wholesale() {
        let mut roster = RosterStore::new(local());
        roster.upsert(Contact::new("old@example.com", "Old"));
        roster.replace_all(vec![
            Contact::new("a@example.com", "A"),
            Contact::new(local(), "Me"),
        ]);

        let addresses: Vec<_> = roster.all().map(|c| c.address.as_str()).collect();
        assert_eq!(addresses, vec!["a@example.com"]);
    }

    #[test]
    fn test_names_with_prefix_skips_unnamed() {
        let mut roster = RosterStore::new(local());
        roster.upsert(Contact::new("bob@example.com", "Bob"));
        roster.upsert(Contact::new("bo@example.com", ""));
        roster.upsert(Contact::new("alice@example.com", "Alice"));

        let names: Vec<_> = roster.names_with_prefix("Bo").collect();
        assert_eq!(names, vec!["Bob"]);
    }

    #[test]
    fn test_serialized_dump_keeps_order_and_presence() {
        let mut roster = RosterStore::new(local());
        roster.upsert(
            Contact::new("bob@example.com", "Bob").with_resource("pc", PresenceStatus::Away),
        );
        roster.upsert(Contact::new("alice@example.com", "Alice"));

        let text = serde_json::to_string(&roster).unwrap();
        let bob = text.find("\"bob@example.com\":").unwrap();
        let alice = text.find("\"alice@example.com\":").unwrap();
        assert!(bob < alice);

        let dump: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(dump["contacts"]["bob@example.com"]["resources"]["pc"], "away");
    }

    #[derive(Debug, Clone)]
    enum Mutation {
        Upsert(usize, String),
        Presence(usize, PresenceStatus),
        Rename(usize, String),
        Remove(usize),
        Snapshot(Vec<usize>),
    }

    const ADDRESSES: [&str; 4] = [
        "me@example.com",
        "a@example.com",
        "b@example.com",
        "c@example.com",
    ];

    fn status() -> impl Strategy<Value = PresenceStatus> {
        prop_oneof![
            Just(PresenceStatus::Available),
            Just(PresenceStatus::Away),
            Just(PresenceStatus::ExtendedAway),
            Just(PresenceStatus::Offline),
        ]
    }

    fn mutation() -> impl Strategy<Value = Mutation> {
        prop_oneof![
            (0..ADDRESSES.len(), "[a-z]{0,4}").prop_map(|(i, n)| Mutation::Upsert(i, n)),
            (0..ADDRESSES.len(), status()).prop_map(|(i, s)| Mutation::Presence(i, s)),
            (0..ADDRESSES.len(), "[a-z]{1,4}").prop_map(|(i, n)| Mutation::Rename(i, n)),
            (0..ADDRESSES.len()).prop_map(Mutation::Remove),
            prop::collection::vec(0..ADDRESSES.len(), 0..4).prop_map(Mutation::Snapshot),
        ]
    }

    proptest! {
        #[test]
        fn prop_local_address_never_listed(mutations in prop::collection::vec(mutation(), 0..40)) {
            let mut roster = RosterStore::new(local());
            for mutation in mutations {
                match mutation {
                    Mutation::Upsert(i, name) => roster.upsert(Contact::new(ADDRESSES[i], name)),
                    Mutation::Presence(i, status) => {
                        roster.apply_presence(&ADDRESSES[i].into(), "res", status);
                    }
                    Mutation::Rename(i, name) => roster.rename(&ADDRESSES[i].into(), &name),
                    Mutation::Remove(i) => {
                        roster.remove(&ADDRESSES[i].into());
                    }
                    Mutation::Snapshot(indices) => roster.replace_all(
                        indices.into_iter().map(|i| Contact::new(ADDRESSES[i], "n")).collect(),
                    ),
                }
                prop_assert!(roster.all().all(|c| c.address != local()));
                prop_assert!(roster.find_by_address(&local()).is_none());
            }
        }
    }
}
