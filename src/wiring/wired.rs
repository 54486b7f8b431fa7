//! # Declarative wiring for types.
//!
//! [`Wired`] is the explicit replacement for construction-time magic: a type
//! declares its tagged members once, statically, in [`Wired::wiring`], and
//! the bus performs the two-phase registration when an instance is built
//! through [`EventBus::construct`](crate::EventBus::construct):
//!
//! - **type-level tags** (`follow_fn`, `expose_fn`) are registered once per
//!   bus on the first touch of the type — the definition-time phase;
//! - **instance tags** (`follow`, `expose`) are registered for every
//!   instance, weakly bound to it, so each instance is an independent
//!   subscriber/publisher even though they share one declaration.
//!
//! ## Example
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use chatter::{EventBus, Kwargs, Ticket, Wired, Wiring};
//!
//! struct Auditor {
//!     seen: AtomicUsize,
//! }
//!
//! impl Wired for Auditor {
//!     fn wiring() -> Wiring<Self> {
//!         Wiring::new()
//!             .follow("order", |this: &Self, _ticket: &Ticket| {
//!                 this.seen.fetch_add(1, Ordering::SeqCst);
//!                 Ok(())
//!             })
//!             .expose("audit:done")
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let auditor = bus.construct(Auditor { seen: AtomicUsize::new(0) });
//! bus.publish("order", vec![], Kwargs::new()).unwrap();
//! assert_eq!(auditor.seen.load(Ordering::SeqCst), 1);
//! ```

use std::sync::Arc;

use crate::events::{Identifier, Ticket};
use crate::subscribers::{Guard, Handler, HandlerResult};

pub(crate) type Method<T> = Arc<dyn Fn(&T, &Ticket) -> HandlerResult + Send + Sync>;

/// A type that declares bus subscriptions/expositions for its members.
pub trait Wired: Send + Sync + Sized + 'static {
    /// Static declaration of this type's tagged members.
    fn wiring() -> Wiring<Self>;
}

pub(crate) struct MemberFollow<T> {
    pub identifier: Identifier,
    pub guard: Option<Guard>,
    pub method: Method<T>,
}

pub(crate) struct StaticFollow {
    pub identifier: Identifier,
    pub guard: Option<Guard>,
    pub handler: Handler,
}

/// Builder for a type's tagged members. See [`Wired`].
pub struct Wiring<T> {
    pub(crate) follows: Vec<MemberFollow<T>>,
    pub(crate) exposes: Vec<Identifier>,
    pub(crate) static_follows: Vec<StaticFollow>,
    pub(crate) static_exposes: Vec<Identifier>,
}

impl<T> Wiring<T> {
    pub fn new() -> Self {
        Self {
            follows: Vec::new(),
            exposes: Vec::new(),
            static_follows: Vec::new(),
            static_exposes: Vec::new(),
        }
    }

    /// Tags an instance method as a subscriber for `pattern`.
    pub fn follow<F>(mut self, pattern: &str, method: F) -> Self
    where
        F: Fn(&T, &Ticket) -> HandlerResult + Send + Sync + 'static,
    {
        self.follows.push(MemberFollow {
            identifier: Identifier::parse(pattern),
            guard: None,
            method: Arc::new(method),
        });
        self
    }

    /// Tags an instance method as a subscriber with a guard predicate.
    pub fn follow_when<F, G>(mut self, pattern: &str, guard: G, method: F) -> Self
    where
        F: Fn(&T, &Ticket) -> HandlerResult + Send + Sync + 'static,
        G: Fn(&Ticket) -> bool + Send + Sync + 'static,
    {
        self.follows.push(MemberFollow {
            identifier: Identifier::parse(pattern),
            guard: Some(Arc::new(guard)),
            method: Arc::new(method),
        });
        self
    }

    /// Declares the instance as a publisher for `pattern` (introspection
    /// only; publishing still happens through the bus).
    pub fn expose(mut self, pattern: &str) -> Self {
        self.exposes.push(Identifier::parse(pattern));
        self
    }

    /// Tags a free function as a subscriber, registered once per bus at the
    /// type's first touch.
    pub fn follow_fn<F>(mut self, pattern: &str, f: F) -> Self
    where
        F: Fn(&Ticket) -> HandlerResult + Send + Sync + 'static,
    {
        self.static_follows.push(StaticFollow {
            identifier: Identifier::parse(pattern),
            guard: None,
            handler: Arc::new(f),
        });
        self
    }

    /// Like [`Wiring::follow_fn`] with a guard predicate.
    pub fn follow_fn_when<F, G>(mut self, pattern: &str, guard: G, f: F) -> Self
    where
        F: Fn(&Ticket) -> HandlerResult + Send + Sync + 'static,
        G: Fn(&Ticket) -> bool + Send + Sync + 'static,
    {
        self.static_follows.push(StaticFollow {
            identifier: Identifier::parse(pattern),
            guard: Some(Arc::new(guard)),
            handler: Arc::new(f),
        });
        self
    }

    /// Declares the type itself as a publisher for `pattern`, registered
    /// once per bus at the type's first touch.
    pub fn expose_fn(mut self, pattern: &str) -> Self {
        self.static_exposes.push(Identifier::parse(pattern));
        self
    }
}

impl<T> Default for Wiring<T> {
    fn default() -> Self {
        Self::new()
    }
}
