use glam::{EulerRot, Quat};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use uuid::Uuid;

/// Unique identifier for one mount of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MountId(pub Uuid);

impl MountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell mounts apart in logs.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for MountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short())
    }
}

/// Latest pointer position inside the container, normalized to `[-1, 1]`.
///
/// `x` grows to the right, `y` grows upwards (screen y is flipped).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
}

impl PointerState {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }
}

/// Yaw increment applied per frame, in radians.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct RotationSpeed(f32);

impl RotationSpeed {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 0.05;
    pub const DEFAULT: f32 = 0.01;

    /// Build a speed, clamping into `[MIN, MAX]`. NaN maps to `MIN`.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self(Self::MIN)
        } else {
            Self(value.clamp(Self::MIN, Self::MAX))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for RotationSpeed {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<f32> for RotationSpeed {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<RotationSpeed> for f32 {
    fn from(speed: RotationSpeed) -> Self {
        speed.0
    }
}

/// Euler rotation of the cube in radians.
///
/// Pitch is about X, yaw about Y, roll about Z, composed in X-Y-Z order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CubePose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl CubePose {
    /// Advance yaw by `delta`, keeping it in `[0, TAU)`.
    pub fn add_yaw(&mut self, delta: f32) {
        self.yaw = (self.yaw + delta).rem_euclid(TAU);
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.pitch, self.yaw, self.roll)
    }
}

/// Pixel size of the container or drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height. Callers must check `is_empty` first.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Container rectangle in the same coordinate space as pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Bounds covering a viewport anchored at the origin.
    pub fn from_viewport(viewport: Viewport) -> Self {
        Self::new(0.0, 0.0, viewport.width as f32, viewport.height as f32)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_id_uniqueness() {
        let a = MountId::new();
        let b = MountId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn rotation_speed_clamps() {
        assert_eq!(RotationSpeed::new(1.0).get(), RotationSpeed::MAX);
        assert_eq!(RotationSpeed::new(-0.3).get(), RotationSpeed::MIN);
        assert_eq!(RotationSpeed::new(f32::NAN).get(), RotationSpeed::MIN);
        assert_eq!(RotationSpeed::new(0.02).get(), 0.02);
        assert_eq!(RotationSpeed::default().get(), 0.01);
    }

    #[test]
    fn pointer_state_clamps() {
        let p = PointerState::new(3.0, -7.0);
        assert_eq!(p, PointerState { x: 1.0, y: -1.0 });
        assert_eq!(PointerState::default(), PointerState { x: 0.0, y: 0.0 });
    }

    #[test]
    fn yaw_wraps_into_full_turn() {
        let mut pose = CubePose {
            yaw: TAU - 0.01,
            ..CubePose::default()
        };
        pose.add_yaw(0.02);
        assert!(pose.yaw >= 0.0 && pose.yaw < 0.02);
    }

    #[test]
    fn identity_pose_is_identity_rotation() {
        let q = CubePose::default().rotation();
        assert!(q.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn viewport_aspect() {
        let v = Viewport::new(1280, 720);
        assert_eq!(v.aspect(), 1280.0 / 720.0);
        assert!(Viewport::new(0, 10).is_empty());
        assert!(Bounds::new(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(!Bounds::from_viewport(v).is_empty());
    }
}
