//! Developer tooling for the cube widget.
//!
//! # Invariants
//! - Inspection is read-only; nothing here mutates a mount.

mod inspector;

pub use inspector::{WidgetInspector, WidgetSummary};
