//! Per-connection subscription manager.
//!
//! Tracks which topics a WebSocket client is subscribed to. A topic is the
//! UUID of a listing, conversation or transaction.

use std::collections::HashSet;

use uuid::Uuid;

/// Token that subscribes to every topic.
pub const WILDCARD: &str = "*";

/// Manages the set of topic subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed topics. Ignored while `subscribe_all` is set.
    topics: HashSet<Uuid>,
    /// Whether the client subscribes to all topics (wildcard `"*"`).
    subscribe_all: bool,
}

/// Topics parsed from a command, plus whether the wildcard was present.
/// Unparseable entries are returned in `rejected`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedTopics {
    /// Valid topic UUIDs.
    pub topics: Vec<Uuid>,
    /// Whether `"*"` appeared.
    pub wildcard: bool,
    /// Entries that were neither `"*"` nor a UUID.
    pub rejected: Vec<String>,
}

impl ParsedTopics {
    /// Parses raw topic strings.
    #[must_use]
    pub fn parse(raw: &[String]) -> Self {
        let mut parsed = Self::default();
        for entry in raw {
            let entry = entry.trim();
            if entry == WILDCARD {
                parsed.wildcard = true;
            } else if let Ok(uuid) = entry.parse::<Uuid>() {
                parsed.topics.push(uuid);
            } else {
                parsed.rejected.push(entry.to_string());
            }
        }
        parsed
    }
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds topics to the subscription set.
    pub fn subscribe(&mut self, topics: &[Uuid], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.topics.extend(topics.iter().copied());
    }

    /// Removes topics from the subscription set; `wildcard` clears it.
    pub fn unsubscribe(&mut self, topics: &[Uuid], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for topic in topics {
            self.topics.remove(topic);
        }
    }

    /// Returns `true` if an event filed under `topic` should be delivered.
    #[must_use]
    pub fn matches(&self, topic: Uuid) -> bool {
        self.subscribe_all || self.topics.contains(&topic)
    }

    /// Returns the number of explicitly subscribed topics.
    #[must_use]
    pub fn count(&self) -> usize {
        self.topics.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_nothing() {
        let mgr = SubscriptionManager::new();
        assert!(!mgr.matches(Uuid::new_v4()));
    }

    #[test]
    fn subscribe_specific_topic() {
        let mut mgr = SubscriptionManager::new();
        let id = Uuid::new_v4();
        mgr.subscribe(&[id], false);
        assert!(mgr.matches(id));
        assert!(!mgr.matches(Uuid::new_v4()));
    }

    #[test]
    fn wildcard_on_and_off() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[], true);
        assert!(mgr.matches(Uuid::new_v4()));
        mgr.unsubscribe(&[], true);
        assert!(!mgr.matches(Uuid::new_v4()));
    }

    #[test]
    fn unsubscribe_removes_topic() {
        let mut mgr = SubscriptionManager::new();
        let id = Uuid::new_v4();
        mgr.subscribe(&[id, Uuid::new_v4()], false);
        mgr.unsubscribe(&[id], false);
        assert!(!mgr.matches(id));
        assert_eq!(mgr.count(), 1);
    }

    #[test]
    fn parse_sorts_entries() {
        let id = Uuid::new_v4();
        let parsed = ParsedTopics::parse(&[id.to_string(), "*".to_string(), "nope".to_string()]);
        assert_eq!(parsed.topics, vec![id]);
        assert!(parsed.wildcard);
        assert_eq!(parsed.rejected, vec!["nope".to_string()]);
    }
}
