//! # Follower and exposition registries.
//!
//! [`Registry`] owns the two structures behind an event bus:
//!
//! - *followers*: concrete topic name → ordered list of subscription
//!   entries. Order is registration order; duplicates are allowed and all
//!   fire independently. Subscriptions with a wildcarded name land in the
//!   literal `None` bucket — a key distinct from every concrete topic name,
//!   so they only fire for events published without a concrete name.
//! - *expositions*: ordered set of declared publishers, idempotent per
//!   `(identifier, handle)` identity pair, used only for introspection.
//!
//! Dead entries are never removed; dispatch skips them. The mutex wrapping
//! lives in the bus, which snapshots a bucket before dispatching so the
//! lock is never held across a subscriber invocation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::events::Identifier;
use crate::subscribers::{Guard, SubscriberRef};

/// One subscription: pattern, handle and optional guard.
pub(crate) struct FollowerEntry {
    pub identifier: Identifier,
    pub subscriber: SubscriberRef,
    pub guard: Option<Guard>,
}

struct ExpositionEntry {
    identifier: Identifier,
    subscriber: SubscriberRef,
}

/// Registry of followers (dispatch) and expositions (introspection).
pub(crate) struct Registry {
    followers: BTreeMap<Option<String>, Vec<Arc<FollowerEntry>>>,
    expositions: Vec<ExpositionEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            followers: BTreeMap::new(),
            expositions: Vec::new(),
        }
    }

    /// Appends a subscription under its pattern's name bucket.
    pub fn add_follower(
        &mut self,
        identifier: Identifier,
        subscriber: SubscriberRef,
        guard: Option<Guard>,
    ) {
        let key = identifier.bucket_key();
        self.followers
            .entry(key)
            .or_default()
            .push(Arc::new(FollowerEntry {
                identifier,
                subscriber,
                guard,
            }));
    }

    /// Records a declared publisher; idempotent for the same identity pair.
    pub fn add_exposition(&mut self, identifier: Identifier, subscriber: SubscriberRef) {
        let duplicate = self
            .expositions
            .iter()
            .any(|e| e.identifier == identifier && e.subscriber.same_target(&subscriber));
        if duplicate {
            return;
        }
        self.expositions.push(ExpositionEntry {
            identifier,
            subscriber,
        });
    }

    /// Snapshot of the bucket under the exact key (no wildcard expansion).
    pub fn bucket(&self, key: &Option<String>) -> Vec<Arc<FollowerEntry>> {
        self.followers.get(key).cloned().unwrap_or_default()
    }

    /// Sorted, deduplicated `"name:action"` strings for live expositions.
    pub fn exposition_topics(&self) -> Vec<String> {
        let mut topics = BTreeSet::new();
        for entry in &self.expositions {
            if entry.subscriber.is_alive() {
                topics.extend(entry.identifier.topic_strings());
            }
        }
        topics.into_iter().collect()
    }

    /// Sorted, deduplicated `"name:action"` strings for live followers.
    pub fn follower_topics(&self) -> Vec<String> {
        let mut topics = BTreeSet::new();
        for entry in self.followers.values().flatten() {
            if entry.subscriber.is_alive() {
                topics.extend(entry.identifier.topic_strings());
            }
        }
        topics.into_iter().collect()
    }

    /// Graphviz DOT digraph connecting publisher owner types to subscriber
    /// owner types through their shared topics.
    ///
    /// Free functions are drawn as a shared `fn` node. Topics with a single
    /// publisher and a single subscriber become a direct labeled edge;
    /// anything with more fan-out goes through a joint node.
    pub fn network_graph(&self) -> String {
        let mut topics: BTreeMap<String, (BTreeSet<&str>, BTreeSet<&str>)> = BTreeMap::new();
        for entry in &self.expositions {
            if !entry.subscriber.is_alive() {
                continue;
            }
            let owner = owner_label(entry.subscriber.owner_type());
            for topic in entry.identifier.topic_strings() {
                topics.entry(topic).or_default().0.insert(owner);
            }
        }
        for entry in self.followers.values().flatten() {
            if !entry.subscriber.is_alive() {
                continue;
            }
            let owner = owner_label(entry.subscriber.owner_type());
            for topic in entry.identifier.topic_strings() {
                topics.entry(topic).or_default().1.insert(owner);
            }
        }

        let mut owners: BTreeSet<&str> = BTreeSet::new();
        for (publishers, subscribers) in topics.values() {
            owners.extend(publishers);
            owners.extend(subscribers);
        }

        let mut lines = vec!["digraph {".to_string()];
        for owner in &owners {
            lines.push(format!(
                "  \"{owner}\" [label=\"{owner}\", shape=\"box3d\", bgcolor=\"#C1E4FF\", pencolor=\"#358ACC\"];"
            ));
        }
        for (topic, (publishers, subscribers)) in &topics {
            if publishers.len() == 1 && subscribers.len() == 1 {
                let from = publishers.iter().next().copied().unwrap_or("fn");
                let to = subscribers.iter().next().copied().unwrap_or("fn");
                lines.push(format!("  \"{from}\" -> \"{to}\" [label=\"{topic}\"];"));
            } else {
                lines.push(format!("  \"{topic}\" [shape=\"none\"];"));
                for from in publishers {
                    lines.push(format!("  \"{from}\" -> \"{topic}\" [label=\"\"];"));
                }
                for to in subscribers {
                    lines.push(format!("  \"{topic}\" -> \"{to}\" [label=\"\"];"));
                }
            }
        }
        lines.push("}".to_string());
        lines.join("\n")
    }
}

fn owner_label(owner_type: Option<&'static str>) -> &'static str {
    match owner_type {
        Some(full) => full.rsplit("::").next().unwrap_or(full),
        None => "fn",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_keys_are_exact() {
        let mut registry = Registry::new();
        registry.add_follower(
            Identifier::parse("t"),
            SubscriberRef::function(|_t| Ok(())),
            None,
        );
        registry.add_follower(
            Identifier::parse("*:alert"),
            SubscriberRef::function(|_t| Ok(())),
            None,
        );

        assert_eq!(registry.bucket(&Some("t".to_string())).len(), 1);
        // the wildcard-name entry lives under the literal None key
        assert_eq!(registry.bucket(&None).len(), 1);
        assert!(registry.bucket(&Some("other".to_string())).is_empty());
    }

    #[test]
    fn test_duplicate_followers_allowed() {
        let mut registry = Registry::new();
        let handle = SubscriberRef::function(|_t| Ok(()));
        registry.add_follower(Identifier::parse("t"), handle.clone(), None);
        registry.add_follower(Identifier::parse("t"), handle, None);
        assert_eq!(registry.bucket(&Some("t".to_string())).len(), 2);
    }

    #[test]
    fn test_exposition_idempotent_by_identity() {
        let mut registry = Registry::new();
        let handle = SubscriberRef::function(|_t| Ok(()));
        registry.add_exposition(Identifier::parse("t:run"), handle.clone());
        registry.add_exposition(Identifier::parse("t:run"), handle);
        assert_eq!(registry.exposition_topics(), vec!["t:run".to_string()]);

        // a distinct handle for the same pattern is a new entry, but the
        // topic listing stays deduplicated
        registry.add_exposition(
            Identifier::parse("t:run"),
            SubscriberRef::function(|_t| Ok(())),
        );
        assert_eq!(registry.exposition_topics(), vec!["t:run".to_string()]);
    }

    #[test]
    fn test_topic_listings_sorted() {
        let mut registry = Registry::new();
        registry.add_follower(
            Identifier::parse("b:run"),
            SubscriberRef::function(|_t| Ok(())),
            None,
        );
        registry.add_follower(
            Identifier::parse("a"),
            SubscriberRef::function(|_t| Ok(())),
            None,
        );
        assert_eq!(
            registry.follower_topics(),
            vec![
                "a:entry".to_string(),
                "a:exit".to_string(),
                "b:run".to_string()
            ]
        );
    }

    #[test]
    fn test_network_graph_direct_edge() {
        let mut registry = Registry::new();
        registry.add_exposition(
            Identifier::parse("t:run"),
            SubscriberRef::function(|_t| Ok(())),
        );
        registry.add_follower(
            Identifier::parse("t:run"),
            SubscriberRef::function(|_t| Ok(())),
            None,
        );
        let dot = registry.network_graph();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("\"fn\" -> \"fn\" [label=\"t:run\"];"));
        assert!(dot.ends_with('}'));
    }
}
