//! Event naming and payload types: [`Identifier`] patterns and [`Ticket`]
//! payloads.

mod identifier;
mod ticket;

pub use identifier::{Identifier, MatchMode, ACTION_CALL, ACTION_ENTRY, ACTION_EXIT};
pub use ticket::{Kwargs, Ticket};
