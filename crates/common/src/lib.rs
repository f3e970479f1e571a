//! Shared types for the spincube workspace.
//!
//! # Invariants
//! - `RotationSpeed` never leaves `[RotationSpeed::MIN, RotationSpeed::MAX]`.
//! - `PointerState` components never leave `[-1, 1]`.

mod types;

pub use types::{Bounds, CubePose, MountId, PointerState, RotationSpeed, Viewport};
