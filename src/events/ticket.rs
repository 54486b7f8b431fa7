//! # Immutable event payload delivered to subscribers.
//!
//! A [`Ticket`] is created fresh per publish call and carries the published
//! identifier, positional arguments, named arguments and a hop counter.
//! Clones share the argument storage (`Arc`), so handing a ticket to a
//! worker is cheap.
//!
//! ## Hop counter
//! The counter is advisory bookkeeping for republish chains: each
//! [`Ticket::republish`] emits a derived event with `hops - 1`. The bus
//! never inspects the counter and nothing stops it from going negative;
//! bounding deep republish chains is the caller's responsibility.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::core::EventBus;
use crate::error::BusError;
use crate::events::Identifier;

/// Ordered map of named arguments attached to an event.
pub type Kwargs = BTreeMap<String, Value>;

/// Immutable payload for one published event.
#[derive(Clone)]
pub struct Ticket {
    identifier: Identifier,
    args: Arc<Vec<Value>>,
    kwargs: Arc<Kwargs>,
    hops: i64,
    bus: EventBus,
}

impl Ticket {
    pub(crate) fn new(
        bus: EventBus,
        identifier: Identifier,
        args: Vec<Value>,
        kwargs: Kwargs,
        hops: i64,
    ) -> Self {
        Self {
            identifier,
            args: Arc::new(args),
            kwargs: Arc::new(kwargs),
            hops,
            bus,
        }
    }

    /// The identifier this event was published under.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Topic name of the published identifier.
    pub fn name(&self) -> Option<&str> {
        self.identifier.name()
    }

    /// Action set of the published identifier.
    pub fn actions(&self) -> Option<&BTreeSet<String>> {
        self.identifier.actions()
    }

    /// Positional arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Positional argument by index.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Named arguments.
    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    /// Named argument by key.
    pub fn named(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    /// Remaining hop budget (advisory; may be negative).
    pub fn hops(&self) -> i64 {
        self.hops
    }

    /// Publishes a derived event through the owning bus with `hops - 1`.
    ///
    /// Lets a subscriber act as a publisher for a follow-up event in the
    /// same logical causal chain. No floor is enforced on the counter.
    pub fn republish(&self, pattern: &str, kwargs: Kwargs) -> Result<(), BusError> {
        self.bus
            .publish_event(Identifier::parse(pattern), Vec::new(), kwargs, self.hops - 1)
    }

    /// Invokes `f` with the named-argument map, easing delegation to
    /// functions that take the event's kwargs directly.
    pub fn apply<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Kwargs) -> R,
    {
        f(&self.kwargs)
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("identifier", &self.identifier)
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .field("hops", &self.hops)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_ticket() -> Ticket {
        let bus = EventBus::new();
        let kwargs = Kwargs::from([("who".to_string(), json!("tester"))]);
        Ticket::new(
            bus,
            Identifier::parse("t:run"),
            vec![json!(1), json!("two")],
            kwargs,
            100,
        )
    }

    #[test]
    fn test_accessors() {
        let ticket = sample_ticket();
        assert_eq!(ticket.name(), Some("t"));
        let actions = ticket.actions().expect("concrete actions");
        assert!(actions.contains("run"));
        assert_eq!(actions.len(), 1);
        assert_eq!(ticket.arg(0), Some(&json!(1)));
        assert_eq!(ticket.arg(2), None);
        assert_eq!(ticket.named("who"), Some(&json!("tester")));
        assert_eq!(ticket.named("missing"), None);
        assert_eq!(ticket.hops(), 100);
    }

    #[test]
    fn test_apply_passes_kwargs() {
        let ticket = sample_ticket();
        let who = ticket.apply(|kwargs| kwargs["who"].clone());
        assert_eq!(who, json!("tester"));
    }

    #[test]
    fn test_clone_shares_payload() {
        let ticket = sample_ticket();
        let copy = ticket.clone();
        assert_eq!(copy.args(), ticket.args());
        assert_eq!(copy.hops(), ticket.hops());
    }
}
