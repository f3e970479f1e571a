//! Widget mount: ties capability detection, scene construction, the startup
//! delay, the frame loop and input together for one instance.
//!
//! # Invariants
//! - A failed capability probe never constructs a scene.
//! - The scene is created once per mount and dropped as a unit.
//! - After `unmount` (or drop) no listener and no callback remains.

mod config;
mod mount;

pub use config::WidgetConfig;
pub use mount::{MountError, Widget};
