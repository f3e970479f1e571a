use spincube_common::{CubePose, PointerState, RotationSpeed};

/// Maximum tilt in radians when the pointer sits on the container edge.
pub const TILT_RANGE: f32 = 0.2;

/// Fraction of the remaining tilt error removed each frame.
pub const TILT_SMOOTHING: f32 = 0.05;

/// Tilt the pointer asks for, as `(pitch, roll)`.
///
/// Vertical pointer motion pitches the cube, horizontal motion rolls it.
pub fn tilt_target(pointer: PointerState) -> (f32, f32) {
    (pointer.y * TILT_RANGE, pointer.x * TILT_RANGE)
}

/// Advance the pose by one frame.
///
/// Yaw accumulates `speed` unconditionally. Pitch and roll follow a
/// first-order low-pass toward the pointer target, so the remaining error
/// shrinks by `1 - TILT_SMOOTHING` every frame.
pub fn advance(pose: &mut CubePose, pointer: PointerState, speed: RotationSpeed) {
    pose.add_yaw(speed.get());

    let (target_pitch, target_roll) = tilt_target(pointer);
    pose.pitch += (target_pitch - pose.pitch) * TILT_SMOOTHING;
    pose.roll += (target_roll - pose.roll) * TILT_SMOOTHING;
}
