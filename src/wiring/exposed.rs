//! # Functional registration wrappers.
//!
//! Free-function counterparts of the declarative tags:
//!
//! - [`follow`] / [`follow_when`] register a plain function as a
//!   subscriber, held strongly for the registry's lifetime.
//! - [`expose`] registers a function as a declared publisher and returns an
//!   [`Exposed`] wrapper whose [`Exposed::call`] publishes `entry` before
//!   and/or `exit` after invoking the function, according to the pattern's
//!   action set, passing the return value through.
//!
//! ## Example
//! ```
//! use chatter::{expose, follow, EventBus, Kwargs, Value};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let bus = EventBus::new();
//! let entries = Arc::new(AtomicUsize::new(0));
//! let seen = Arc::clone(&entries);
//! follow(&bus, "save:entry", move |_ticket| {
//!     seen.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! let save = expose(&bus, "save", |args: &[Value], _kwargs: &Kwargs| args.len());
//! let stored = save.call(vec![Value::from(1)], Kwargs::new()).unwrap();
//! assert_eq!(stored, 1);
//! assert_eq!(entries.load(Ordering::SeqCst), 1);
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::core::EventBus;
use crate::error::BusError;
use crate::events::{Identifier, Kwargs, Ticket, ACTION_ENTRY, ACTION_EXIT};
use crate::subscribers::{HandlerResult, SubscriberRef};

/// Registers a free-function subscriber for `pattern`.
pub fn follow<F>(bus: &EventBus, pattern: &str, f: F)
where
    F: Fn(&Ticket) -> HandlerResult + Send + Sync + 'static,
{
    bus.register_subscriber(Identifier::parse(pattern), SubscriberRef::function(f), None);
}

/// Registers a free-function subscriber with a guard predicate, evaluated
/// only after the topic match succeeds.
pub fn follow_when<F, G>(bus: &EventBus, pattern: &str, guard: G, f: F)
where
    F: Fn(&Ticket) -> HandlerResult + Send + Sync + 'static,
    G: Fn(&Ticket) -> bool + Send + Sync + 'static,
{
    bus.register_subscriber(
        Identifier::parse(pattern),
        SubscriberRef::function(f),
        Some(Arc::new(guard)),
    );
}

/// Registers `f` as a declared publisher for `pattern` and wraps it.
///
/// The action set of the parsed pattern decides the wrapping: `entry` in
/// the set publishes a `name:entry` event before each call, `exit`
/// publishes `name:exit` after. A bare `"name"` pattern gets both. Other
/// action sets register the exposition without wrapping.
pub fn expose<F, R>(bus: &EventBus, pattern: &str, f: F) -> Exposed<F>
where
    F: Fn(&[Value], &Kwargs) -> R,
{
    let identifier = Identifier::parse(pattern);
    bus.register_publisher(identifier.clone(), SubscriberRef::function(|_t| Ok(())));
    Exposed {
        bus: bus.clone(),
        entry: identifier.has_action(ACTION_ENTRY),
        exit: identifier.has_action(ACTION_EXIT),
        identifier,
        inner: f,
    }
}

/// A function wrapped as a publisher; see [`expose`].
pub struct Exposed<F> {
    bus: EventBus,
    identifier: Identifier,
    entry: bool,
    exit: bool,
    inner: F,
}

impl<F, R> Exposed<F>
where
    F: Fn(&[Value], &Kwargs) -> R,
{
    /// Invokes the wrapped function, publishing the `entry`/`exit` events
    /// around it. The function's return value passes through unchanged.
    ///
    /// With an empty pool the surrounding publishes run synchronously, so a
    /// subscriber failure on the `entry` event prevents the wrapped call.
    pub fn call(&self, args: Vec<Value>, kwargs: Kwargs) -> Result<R, BusError> {
        let hops = self.bus.config().initial_hops;
        if self.entry {
            self.bus.publish_event(
                self.identifier.with_action(ACTION_ENTRY),
                args.clone(),
                kwargs.clone(),
                hops,
            )?;
        }
        let out = (self.inner)(&args, &kwargs);
        if self.exit {
            self.bus.publish_event(
                self.identifier.with_action(ACTION_EXIT),
                args,
                kwargs,
                hops,
            )?;
        }
        Ok(out)
    }

    /// The pattern this exposition was declared under.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }
}
