//! wgpu render backend for the cube widget.
//!
//! Draws one metallic cube lit by ambient, directional and point lights, with
//! soft shadows from the directional light onto a transparent floor.
//!
//! # Invariants
//! - The renderer never mutates widget state; it draws the staged pose.
//! - A resize is applied before the next draw, never after.
//! - Dropping a `WgpuScene` destroys every buffer and texture it created.

mod gpu;
mod mesh;
mod probe;
mod shaders;

pub use gpu::WgpuScene;
pub use probe::HardwareProbe;
