//! Recipient resolution
//!
//! Turns a typed chat line into `(recipient, body)` using the roster and the
//! sticky last recipient. A line of the form `NAME: MESSAGE` names its
//! recipient explicitly; anything else continues the conversation with the
//! last recipient. When an explicit name is unknown but a different sticky
//! recipient exists, the line goes to the sticky recipient. The body is then
//! the whole line, not just the text after `": "`: the leading `WORD: ` was
//! most likely part of the message and is kept rather than dropped.
//!
//! Resolution never updates the sticky recipient. The caller does that once
//! the transport acknowledges the send.

use crate::errors::ResolveError;
use crate::roster::RosterStore;
use crate::types::Address;

const SEPARATOR: &str = ": ";

/// Where a chat line should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Display name the line resolved through; becomes the sticky recipient
    pub name: String,
    pub address: Address,
    /// Message text, possibly empty
    pub body: String,
}

pub struct RecipientResolver<'a> {
    roster: &'a RosterStore,
    last_recipient: Option<&'a str>,
}

impl<'a> RecipientResolver<'a> {
    pub fn new(roster: &'a RosterStore, last_recipient: Option<&'a str>) -> Self {
        Self {
            roster,
            last_recipient,
        }
    }

    pub fn resolve(&self, line: &str) -> Result<ResolvedTarget, ResolveError> {
        let (name, body, explicit) = match line.split_once(SEPARATOR) {
            Some((name, body)) => (name, body, true),
            None => match self.last_recipient {
                Some(last) => (last, line, false),
                None => return Err(ResolveError::NoRecipient),
            },
        };

        if let Some(target) = self.lookup(name, body) {
            return Ok(target);
        }

        if explicit {
            if let Some(last) = self.last_recipient.filter(|last| *last != name) {
                if let Some(target) = self.lookup(last, line) {
                    return Ok(target);
                }
            }
        }

        Err(ResolveError::UnknownRecipient(name.to_string()))
    }

    fn lookup(&self, name: &str, body: &str) -> Option<ResolvedTarget> {
        self.roster
            .find_by_display_name(name)
            .map(|address| ResolvedTarget {
                name: name.to_string(),
                address: address.clone(),
                body: body.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Contact;

    fn roster() -> RosterStore {
        let mut roster = RosterStore::new(Address::new("me@example.com"));
        roster.upsert(Contact::new("alice@example.com", "Alice"));
        roster.upsert(Contact::new("bob@example.com", "Bob"));
        roster
    }

    #[test]
    fn test_continuation_goes_to_last_recipient() {
        let roster = roster();
        let target = RecipientResolver::new(&roster, Some("Alice")).resolve("hello").unwrap();
        assert_eq!(target.address.as_str(), "alice@example.com");
        assert_eq!(target.body, "hello");
    }

    #[test]
    fn test_explicit_name_splits_on_first_separator() {
        let roster = roster();
        let target = RecipientResolver::new(&roster, None).resolve("Bob: hi: there").unwrap();
        assert_eq!(target.name, "Bob");
        assert_eq!(target.address.as_str(), "bob@example.com");
        assert_eq!(target.body, "hi: there");
    }

    #[test]
    fn test_empty_body_is_permitted() {
        let roster = roster();
        let target = RecipientResolver::new(&roster, None).resolve("Bob: ").unwrap();
        assert_eq!(target.body, "");
    }

    #[test]
    fn test_no_separator_and_no_last_recipient() {
        let roster = roster();
        assert_eq!(
            RecipientResolver::new(&roster, None).resolve("hello"),
            Err(ResolveError::NoRecipient)
        );
    }

    #[test]
    fn test_unknown_name_without_fallback() {
        let roster = roster();
        assert_eq!(
            RecipientResolver::new(&roster, None).resolve("Unknown: hi"),
            Err(ResolveError::UnknownRecipient("Unknown".to_string()))
        );
    }

    #[test]
    fn test_unknown_name_falls_back_to_last_recipient_with_whole_line() {
        let roster = roster();
        let target = RecipientResolver::new(&roster, Some("Alice"))
            .resolve("note: the build is green")
            .unwrap();
        assert_eq!(target.name, "Alice");
        assert_eq!(target.body, "note: the build is green");
    }

    #[test]
    fn test_stale_last_recipient_is_unknown() {
        let roster = roster();
        assert_eq!(
            RecipientResolver::new(&roster, Some("Carol")).resolve("hello"),
            Err(ResolveError::UnknownRecipient("Carol".to_string()))
        );
        assert_eq!(
            RecipientResolver::new(&roster, Some("Carol")).resolve("Dave: hi"),
            Err(ResolveError::UnknownRecipient("Dave".to_string()))
        );
    }
}
