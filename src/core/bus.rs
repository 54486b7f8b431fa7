//! # The event bus: registration, dispatch and introspection.
//!
//! [`EventBus`] is the registry of publishers ("expositions") and
//! subscribers ("followers") keyed by topic name, plus the worker pool that
//! turns dispatch asynchronous when enabled.
//!
//! ## Dispatch
//! ```text
//! publish(pattern, args, kwargs)
//!   ├─► parse pattern, build Ticket (fresh, immutable)
//!   ├─► snapshot follower bucket under the exact topic-name key
//!   └─► per entry, in registration order:
//!         ├─ topic/action match?      no ─► skip
//!         ├─ guard(ticket)?           no ─► skip
//!         ├─ resolve handle           dead ─► skip silently, keep entry
//!         ├─ pool empty  ─► invoke on the caller's stack (errors propagate)
//!         └─ pool active ─► enqueue (handler, ticket), return immediately
//! ```
//!
//! ## Rules
//! - The registry lock is released before any subscriber runs, so a
//!   subscriber may itself publish (synchronous dispatch is re-entrant on
//!   the same stack; bounding deep republish chains is the caller's job).
//! - Lookup uses the **exact** bucket key; wildcard matching only operates
//!   inside the bucket found under that key. A subscription registered with
//!   a wildcarded name sits in the `None` bucket and therefore only fires
//!   for events published without a concrete name.
//! - Dispatch order follows registration order within a bucket; there is no
//!   cross-bucket ordering guarantee and no delivery guarantee beyond best
//!   effort at dispatch time.

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::core::config::BusConfig;
use crate::core::pool::WorkerPool;
use crate::core::registry::Registry;
use crate::error::{BusError, CapturedError};
use crate::events::{Identifier, Kwargs, Ticket};
use crate::subscribers::{Guard, SubscriberRef};

static GLOBAL: OnceLock<EventBus> = OnceLock::new();

/// In-process publish/subscribe bus. Cheap to clone (shared internals).
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    registry: Mutex<Registry>,
    pool: WorkerPool,
    config: BusConfig,
    wired_types: Mutex<HashSet<TypeId>>,
}

impl EventBus {
    /// Creates a bus with default configuration (no workers).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: Mutex::new(Registry::new()),
                pool: WorkerPool::new(),
                config: BusConfig::default(),
                wired_types: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Creates a bus from an explicit configuration, spawning the initial
    /// worker set if `config.workers > 0`.
    pub fn with_config(config: BusConfig) -> Result<Self, BusError> {
        let bus = Self {
            inner: Arc::new(BusInner {
                registry: Mutex::new(Registry::new()),
                pool: WorkerPool::new(),
                config,
                wired_types: Mutex::new(HashSet::new()),
            }),
        };
        if config.workers > 0 {
            bus.inner.pool.resize(config.workers as i64)?;
        }
        Ok(bus)
    }

    /// Process-wide default bus.
    pub fn global() -> &'static EventBus {
        GLOBAL.get_or_init(EventBus::new)
    }

    /// Active configuration.
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Inserts into the exposition set; idempotent for identical
    /// `(identifier, handle)` identity pairs. No dispatch side effect.
    pub fn register_publisher(&self, identifier: Identifier, subscriber: SubscriberRef) {
        debug!(identifier = %identifier, "registering publisher");
        self.inner
            .registry
            .lock()
            .add_exposition(identifier, subscriber);
    }

    /// Appends a subscription under the pattern's topic-name bucket.
    /// Duplicates are allowed and all fire independently.
    pub fn register_subscriber(
        &self,
        identifier: Identifier,
        subscriber: SubscriberRef,
        guard: Option<Guard>,
    ) {
        debug!(identifier = %identifier, "registering subscriber");
        self.inner
            .registry
            .lock()
            .add_follower(identifier, subscriber, guard);
    }

    /// Publishes an event under `pattern` with the configured hop budget.
    ///
    /// Never blocks waiting for subscribers. With an empty pool, matched
    /// subscribers run on this call's stack and the first failure
    /// propagates out as [`BusError::Handler`]; with an active pool the
    /// work is enqueued and failures are only visible via
    /// [`EventBus::drain_errors`].
    pub fn publish(&self, pattern: &str, args: Vec<Value>, kwargs: Kwargs) -> Result<(), BusError> {
        self.publish_event(
            Identifier::parse(pattern),
            args,
            kwargs,
            self.inner.config.initial_hops,
        )
    }

    /// Full-control publish with an explicit identifier and hop counter.
    pub fn publish_event(
        &self,
        identifier: Identifier,
        args: Vec<Value>,
        kwargs: Kwargs,
        hops: i64,
    ) -> Result<(), BusError> {
        let ticket = Ticket::new(self.clone(), identifier.clone(), args, kwargs, hops);
        let entries = {
            let registry = self.inner.registry.lock();
            registry.bucket(&identifier.bucket_key())
        };
        trace!(identifier = %identifier, candidates = entries.len(), "dispatching");
        for entry in entries {
            if !entry.identifier.matches(&identifier) {
                continue;
            }
            if let Some(guard) = &entry.guard {
                if !guard(&ticket) {
                    trace!(identifier = %identifier, "guard rejected subscriber");
                    continue;
                }
            }
            let Some(handler) = entry.subscriber.resolve() else {
                trace!(identifier = %identifier, "skipping dead subscriber");
                continue;
            };
            if self.inner.pool.is_empty() {
                handler(&ticket)?;
            } else {
                self.inner.pool.submit(handler, ticket.clone());
            }
        }
        Ok(())
    }

    /// Sets the worker count: `0` tears the pool down to zero workers,
    /// `n > 0` grows or shrinks to exactly `n`; negative is rejected.
    pub fn set_multiplicity(&self, n: i64) -> Result<(), BusError> {
        if n == 0 {
            self.inner.pool.shutdown();
            Ok(())
        } else {
            self.inner.pool.resize(n)
        }
    }

    /// Current number of live workers.
    pub fn multiplicity(&self) -> usize {
        self.inner.pool.len()
    }

    /// Returns asynchronously captured subscriber failures; empty once
    /// exhausted. The only channel for observing async failures.
    pub fn drain_errors(&self) -> Vec<CapturedError> {
        self.inner.pool.drain_errors()
    }

    /// Sorted `"name:action"` strings of live declared publishers.
    pub fn exposition_topics(&self) -> Vec<String> {
        self.inner.registry.lock().exposition_topics()
    }

    /// Sorted `"name:action"` strings of live subscriptions.
    pub fn follower_topics(&self) -> Vec<String> {
        self.inner.registry.lock().follower_topics()
    }

    /// Graphviz DOT description of the publisher/subscriber network.
    pub fn network_graph(&self) -> String {
        self.inner.registry.lock().network_graph()
    }

    /// Marks `type_id` as wired; returns true on first touch.
    pub(crate) fn mark_wired(&self, type_id: TypeId) -> bool {
        self.inner.wired_types.lock().insert(type_id)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.inner.config)
            .field("workers", &self.inner.pool.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_publish_reaches_matching_subscriber() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        bus.register_subscriber(
            Identifier::parse("job"),
            SubscriberRef::function(move |_t| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            None,
        );
        bus.publish("job", vec![], Kwargs::new()).expect("publish");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_action_mismatch_skips_subscriber() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        bus.register_subscriber(
            Identifier::parse("job:done"),
            SubscriberRef::function(move |_t| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            None,
        );
        bus.publish("job:started", vec![], Kwargs::new())
            .expect("publish");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ticket_carries_args_and_kwargs() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        bus.register_subscriber(
            Identifier::parse("job"),
            SubscriberRef::function(move |t| {
                *slot.lock() = Some((t.args().to_vec(), t.kwargs().clone(), t.hops()));
                Ok(())
            }),
            None,
        );
        let kwargs = Kwargs::from([("id".to_string(), json!(7))]);
        bus.publish("job", vec![json!("payload")], kwargs)
            .expect("publish");

        let captured = seen.lock().take().expect("subscriber ran");
        assert_eq!(captured.0, vec![json!("payload")]);
        assert_eq!(captured.1["id"], json!(7));
        assert_eq!(captured.2, 100);
    }

    #[test]
    fn test_dispatch_follows_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = Arc::clone(&order);
            bus.register_subscriber(
                Identifier::parse("job"),
                SubscriberRef::function(move |_t| {
                    order.lock().push(n);
                    Ok(())
                }),
                None,
            );
        }
        bus.publish("job", vec![], Kwargs::new()).expect("publish");
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_reentrant_publish_from_subscriber() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let inner_hits = Arc::clone(&hits);
        bus.register_subscriber(
            Identifier::parse("second"),
            SubscriberRef::function(move |_t| {
                inner_hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            None,
        );

        let chained = bus.clone();
        bus.register_subscriber(
            Identifier::parse("first"),
            SubscriberRef::function(move |_t| {
                chained
                    .publish("second", vec![], Kwargs::new())
                    .map_err(|e| crate::error::HandlerError::new("chain", e.to_string()))
            }),
            None,
        );

        bus.publish("first", vec![], Kwargs::new()).expect("publish");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_multiplicity_zero_tears_down() {
        let bus = EventBus::new();
        bus.set_multiplicity(2).expect("grow");
        assert_eq!(bus.multiplicity(), 2);
        bus.set_multiplicity(0).expect("teardown");
        assert_eq!(bus.multiplicity(), 0);
    }

    #[test]
    fn test_set_multiplicity_negative_rejected() {
        let bus = EventBus::new();
        assert!(bus.set_multiplicity(-2).is_err());
    }

    #[test]
    fn test_with_config_spawns_initial_workers() {
        let bus = EventBus::with_config(BusConfig {
            initial_hops: 10,
            workers: 2,
        })
        .expect("config");
        assert_eq!(bus.multiplicity(), 2);
        bus.set_multiplicity(0).expect("teardown");
    }
}
