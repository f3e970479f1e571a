//! Input bridge: translates host events into widget actions.
//!
//! # Invariants
//! - Pointer coordinates are normalized against the bounds delivered with the
//!   event, never against cached bounds.
//! - A listener that has been removed never receives another event.

pub mod action;
mod bridge;
mod listeners;

pub use action::Action;
pub use bridge::normalize_pointer;
pub use listeners::{ListenerHandle, ListenerKind, Listeners};
