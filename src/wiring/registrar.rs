//! # Construction-time registration of wired types.
//!
//! The registrar is the bus-side half of [`Wired`]: it scans a type's
//! declared tags and performs the two-phase registration.
//!
//! ## Phases
//! - **Definition time**: the first time a type is wired on a bus, its
//!   type-level tags (`follow_fn`, `expose_fn`) are registered, bound once
//!   for the type's lifetime.
//! - **Construction time**: every wired instance gets its instance tags
//!   registered, weakly bound to that instance — the bus never keeps the
//!   instance alive, and a dropped instance is skipped silently at
//!   dispatch.

use std::any::TypeId;
use std::sync::Arc;

use tracing::debug;

use crate::core::EventBus;
use crate::events::Ticket;
use crate::subscribers::SubscriberRef;
use crate::wiring::wired::Wired;

impl EventBus {
    /// Builds an instance and wires its declared tags in one step.
    ///
    /// No explicit "connect to bus" call is needed from application code:
    /// declaring tags in [`Wired::wiring`] plus constructing through this
    /// method is sufficient.
    pub fn construct<T: Wired>(&self, value: T) -> Arc<T> {
        let instance = Arc::new(value);
        self.wire(&instance);
        instance
    }

    /// Wires an already-built instance (post-construction hook).
    ///
    /// Wiring the same instance twice duplicates its subscriptions, exactly
    /// like registering the same subscriber twice by hand.
    pub fn wire<T: Wired>(&self, instance: &Arc<T>) {
        let wiring = T::wiring();

        if self.mark_wired(TypeId::of::<T>()) {
            debug!(type_name = std::any::type_name::<T>(), "wiring type-level tags");
            for tag in wiring.static_follows {
                self.register_subscriber(
                    tag.identifier,
                    SubscriberRef::from_handler(tag.handler),
                    tag.guard,
                );
            }
            for identifier in wiring.static_exposes {
                self.register_publisher(identifier, SubscriberRef::type_marker::<T>());
            }
        }

        for tag in wiring.follows {
            let method = tag.method;
            let subscriber =
                SubscriberRef::method(instance, move |owner: &T, ticket: &Ticket| {
                    method(owner, ticket)
                });
            self.register_subscriber(tag.identifier, subscriber, tag.guard);
        }
        for identifier in wiring.exposes {
            self.register_publisher(identifier, SubscriberRef::bound_marker(instance));
        }
    }
}
