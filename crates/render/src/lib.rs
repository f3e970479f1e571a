//! Rendering adapter: renderer-agnostic scene description and backend traits.
//!
//! # Invariants
//! - Renderers never mutate widget state; they draw the pose they are given.
//! - A scene is built from one `SceneDesc` and released as a unit on drop.
//! - `PerspectiveCamera::aspect` always equals the last viewport's width/height.

mod camera;
mod renderer;
mod scene;

pub use camera::PerspectiveCamera;
pub use renderer::{
    Capability, CapabilityProbe, DebugTextRenderer, RenderError, SceneHandle, StaticProbe,
};
pub use scene::{
    AmbientLight, CubeDesc, DirectionalLight, GroundPlane, MaterialDesc, PointLight, Rgb,
    SceneDesc, ShadowDesc,
};
