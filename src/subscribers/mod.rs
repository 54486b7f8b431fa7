//! Subscriber handles: liveness-aware callables and guard predicates.

mod handle;

pub use handle::{Guard, Handler, HandlerResult, SubscriberRef};
