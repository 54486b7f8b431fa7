//! # Liveness-aware callable handles.
//!
//! A [`SubscriberRef`] wraps either a plain function (held strongly) or an
//! object method (held as a weak back-reference to the owner plus a strong
//! reference to the unbound function). Registering a method as a subscriber
//! therefore never keeps its owning object alive — ownership of subscriber
//! objects stays entirely outside the bus.
//!
//! ## Contract
//! - [`SubscriberRef::resolve`] yields `Some(handler)` while the target is
//!   callable, `None` once a bound owner has been dropped.
//! - A bound method resolves to a **freshly bound** callable each time: the
//!   weak owner is upgraded and captured together with the unbound function.
//! - Dead entries are not removed from the registry; the bus skips them
//!   silently at each dispatch.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::HandlerError;
use crate::events::Ticket;

/// Result of one subscriber invocation.
pub type HandlerResult = Result<(), HandlerError>;

/// A resolved, ready-to-invoke subscriber callable.
pub type Handler = Arc<dyn Fn(&Ticket) -> HandlerResult + Send + Sync>;

/// Guard predicate over a ticket; evaluated after the topic match succeeds.
pub type Guard = Arc<dyn Fn(&Ticket) -> bool + Send + Sync>;

type Resolver = Arc<dyn Fn() -> Option<Handler> + Send + Sync>;

/// Liveness-checked handle to a subscriber or publisher callable.
#[derive(Clone)]
pub struct SubscriberRef {
    resolver: Resolver,
    bound: bool,
    owner_type: Option<&'static str>,
}

impl SubscriberRef {
    /// Wraps a free function, held strongly. Always resolves.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Ticket) -> HandlerResult + Send + Sync + 'static,
    {
        Self::from_handler(Arc::new(f))
    }

    /// Wraps an already-erased handler, held strongly.
    pub(crate) fn from_handler(handler: Handler) -> Self {
        let resolver: Resolver = Arc::new(move || Some(Arc::clone(&handler)));
        Self {
            resolver,
            bound: false,
            owner_type: None,
        }
    }

    /// Wraps a method bound to `owner`: a weak back-reference to the owner
    /// plus a strong reference to the unbound function.
    pub fn method<T, F>(owner: &Arc<T>, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &Ticket) -> HandlerResult + Send + Sync + 'static,
    {
        let weak: Weak<T> = Arc::downgrade(owner);
        let unbound = Arc::new(f);
        let resolver: Resolver = Arc::new(move || {
            let owner = weak.upgrade()?;
            let unbound = Arc::clone(&unbound);
            let bound: Handler = Arc::new(move |ticket: &Ticket| unbound(&owner, ticket));
            Some(bound)
        });
        Self {
            resolver,
            bound: true,
            owner_type: Some(type_name::<T>()),
        }
    }

    /// No-op handle tracking `owner`'s liveness. Backs exposition entries
    /// declared on an instance; never invoked by dispatch.
    pub(crate) fn bound_marker<T>(owner: &Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::method(owner, |_owner, _ticket| Ok(()))
    }

    /// Always-live no-op handle attributed to type `T`. Backs exposition
    /// entries declared at type level.
    pub(crate) fn type_marker<T: 'static>() -> Self {
        let mut marker = Self::function(|_ticket| Ok(()));
        marker.owner_type = Some(type_name::<T>());
        marker
    }

    /// Resolves to a callable, or `None` once a bound owner is gone.
    pub fn resolve(&self) -> Option<Handler> {
        (self.resolver)()
    }

    /// True while [`SubscriberRef::resolve`] would succeed.
    pub fn is_alive(&self) -> bool {
        self.resolve().is_some()
    }

    /// True for method handles (weakly bound to an owner).
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Type name of the bound owner, for introspection.
    pub fn owner_type(&self) -> Option<&'static str> {
        self.owner_type
    }

    /// Identity comparison: do both handles wrap the same registration?
    pub(crate) fn same_target(&self, other: &SubscriberRef) -> bool {
        Arc::ptr_eq(&self.resolver, &other.resolver)
    }
}

impl fmt::Debug for SubscriberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRef")
            .field("bound", &self.bound)
            .field("owner_type", &self.owner_type)
            .field("alive", &self.is_alive())
            .finish()
    }
}
