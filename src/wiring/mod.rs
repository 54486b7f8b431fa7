//! Declarative and functional wiring: the [`Wired`] trait with its
//! construction-time registrar, and the [`expose`]/[`follow`] wrappers.

mod exposed;
mod registrar;
mod wired;

pub use exposed::{expose, follow, follow_when, Exposed};
pub use wired::{Wired, Wiring};
