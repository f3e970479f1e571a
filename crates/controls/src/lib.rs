//! Control panel: the user-facing rotation speed setting.
//!
//! # Invariants
//! - The stored speed is always inside the slider range.
//! - Presets bypass step snapping and land on their exact values.

mod panel;

pub use panel::{ControlError, ControlPanel, SLIDER, SliderRange, SpeedPreset};
