//! Request tickets: every outgoing query carries the key it was issued for
//! and a generation number. Only the newest unresolved ticket on a channel
//! is accepted, so a slow response for a superseded key can never land.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    pub key: K,
    pub generation: Generation,
}

#[derive(Debug)]
struct Outstanding<K> {
    ticket: Ticket<K>,
    resolved: bool,
}

#[derive(Debug)]
pub struct RequestChannel<K> {
    counter: u64,
    latest: Option<Outstanding<K>>,
}

impl<K> Default for RequestChannel<K> {
    fn default() -> Self {
        Self { counter: 0, latest: None }
    }
}

impl<K: Clone + PartialEq> RequestChannel<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket for `key`, superseding any outstanding one.
    pub fn issue(&mut self, key: K) -> Ticket<K> {
        self.counter += 1;
        let ticket = Ticket {
            key,
            generation: Generation(self.counter),
        };
        self.latest = Some(Outstanding {
            ticket: ticket.clone(),
            resolved: false,
        });
        ticket
    }

    /// Marks the ticket resolved if it is the current one. Returns whether
    /// the response carrying it should be applied.
    pub fn accept(&mut self, ticket: &Ticket<K>) -> bool {
        match self.latest.as_mut() {
            Some(outstanding) if !outstanding.resolved && outstanding.ticket == *ticket => {
                outstanding.resolved = true;
                true
            }
            _ => false,
        }
    }

    /// Drops the outstanding ticket; whatever answers it later is stale.
    /// The generation counter keeps counting.
    pub fn invalidate(&mut self) {
        self.latest = None;
    }

    pub fn in_flight(&self) -> bool {
        self.latest.as_ref().map_or(false, |outstanding| !outstanding.resolved)
    }

    pub fn current_key(&self) -> Option<&K> {
        self.latest.as_ref().map(|outstanding| &outstanding.ticket.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_ticket_is_accepted() {
        let mut channel = RequestChannel::new();
        let first = channel.issue("staff-a");
        let second = channel.issue("staff-b");

        assert!(second.generation > first.generation);
        assert!(!channel.accept(&first));
        assert!(channel.accept(&second));
    }

    #[test]
    fn test_same_key_reissued_still_discards_older_generation() {
        let mut channel = RequestChannel::new();
        let first = channel.issue("staff-a");
        let again = channel.issue("staff-a");

        assert_eq!(first.key, again.key);
        assert!(!channel.accept(&first));
        assert!(channel.accept(&again));
    }

    #[test]
    fn test_ticket_is_accepted_once() {
        let mut channel = RequestChannel::new();
        let ticket = channel.issue(1);

        assert!(channel.in_flight());
        assert!(channel.accept(&ticket));
        assert!(!channel.in_flight());
        assert!(!channel.accept(&ticket));
    }

    #[test]
    fn test_invalidate_discards_outstanding() {
        let mut channel = RequestChannel::new();
        let ticket = channel.issue(1);
        channel.invalidate();

        assert!(!channel.accept(&ticket));
        assert!(channel.current_key().is_none());

        let next = channel.issue(1);
        assert!(next.generation > ticket.generation);
    }
}
