use glam::{Mat4, Vec3};
use spincube_common::Viewport;

/// Fixed perspective camera looking at the cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 4.0),
            target: Vec3::ZERO,
            fov: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl PerspectiveCamera {
    /// Default camera framed for `viewport`.
    pub fn for_viewport(viewport: Viewport) -> Self {
        let mut camera = Self::default();
        camera.set_viewport(viewport);
        camera
    }

    /// Match the aspect ratio to a new viewport. Empty viewports are ignored.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }
        self.aspect = viewport.aspect();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera() {
        let cam = PerspectiveCamera::default();
        assert_eq!(cam.position.z, 4.0);
        let vp = cam.view_projection();
        // Should produce a valid matrix (no NaN)
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn origin_projects_to_screen_center() {
        let cam = PerspectiveCamera::for_viewport(Viewport::new(800, 600));
        let clip = cam.view_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-6);
        assert!(ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn aspect_tracks_viewport() {
        let mut cam = PerspectiveCamera::default();
        cam.set_viewport(Viewport::new(1024, 300));
        assert_eq!(cam.aspect, 1024.0 / 300.0);
        cam.set_viewport(Viewport::new(0, 300));
        assert_eq!(cam.aspect, 1024.0 / 300.0);
    }
}
