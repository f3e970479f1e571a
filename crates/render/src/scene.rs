use crate::camera::PerspectiveCamera;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use spincube_common::{CubePose, Viewport};
use std::f32::consts::FRAC_PI_2;

/// An sRGB colour given as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xffffff);

    /// Components in `[0, 1]`, still sRGB encoded.
    pub fn to_srgb(self) -> [f32; 3] {
        let r = ((self.0 >> 16) & 0xff) as f32 / 255.0;
        let g = ((self.0 >> 8) & 0xff) as f32 / 255.0;
        let b = (self.0 & 0xff) as f32 / 255.0;
        [r, g, b]
    }

    /// Components converted to linear light, for shading and clear colours.
    pub fn to_linear(self) -> [f32; 3] {
        self.to_srgb().map(srgb_to_linear)
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Reflective surface of the cube.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub color: Rgb,
    pub metalness: f32,
    pub roughness: f32,
    pub env_intensity: f32,
    /// Environment gradient, bottom then top.
    pub env_gradient: (Rgb, Rgb),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubeDesc {
    /// Edge length.
    pub size: f32,
    pub material: MaterialDesc,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientLight {
    pub color: Rgb,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowDesc {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    /// Half extent of the orthographic shadow frustum.
    pub extent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub color: Rgb,
    pub intensity: f32,
    /// The light shines from here toward the origin.
    pub position: Vec3,
    pub shadow: Option<ShadowDesc>,
}

impl DirectionalLight {
    /// View-projection of the shadow camera, if this light casts shadows.
    pub fn shadow_view_projection(&self) -> Option<Mat4> {
        self.shadow.map(|s| {
            let view = Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y);
            let proj =
                Mat4::orthographic_rh(-s.extent, s.extent, -s.extent, s.extent, s.near, s.far);
            proj * view
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub color: Rgb,
    pub intensity: f32,
    /// Range beyond which the light contributes nothing.
    pub distance: f32,
    pub position: Vec3,
}

/// Shadow-catching floor under the cube.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundPlane {
    pub width: f32,
    pub depth: f32,
    pub elevation: f32,
    /// Rotation about X applied to an XY-plane quad.
    pub tilt: f32,
    pub shadow_opacity: f32,
}

impl GroundPlane {
    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(
            Quat::from_rotation_x(self.tilt),
            Vec3::new(0.0, self.elevation, 0.0),
        )
    }
}

/// Everything one mount draws. Built once per mount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneDesc {
    pub background: Rgb,
    pub camera: PerspectiveCamera,
    pub cube: CubeDesc,
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    pub point: PointLight,
    pub ground: GroundPlane,
    pub antialias: bool,
}

impl SceneDesc {
    /// The widget's scene framed for a container of `viewport` pixels.
    pub fn standard(viewport: Viewport) -> Self {
        Self {
            background: Rgb(0x0f0f0f),
            camera: PerspectiveCamera::for_viewport(viewport),
            cube: CubeDesc {
                size: 2.0,
                material: MaterialDesc {
                    color: Rgb(0x4f46e5),
                    metalness: 0.8,
                    roughness: 0.2,
                    env_intensity: 1.0,
                    env_gradient: (Rgb(0x555555), Rgb(0xdddddd)),
                },
                cast_shadow: true,
                receive_shadow: true,
            },
            ambient: AmbientLight {
                color: Rgb(0x404040),
                intensity: 0.5,
            },
            directional: DirectionalLight {
                color: Rgb::WHITE,
                intensity: 1.0,
                position: Vec3::new(5.0, 5.0, 5.0),
                shadow: Some(ShadowDesc {
                    map_size: 2048,
                    near: 0.5,
                    far: 500.0,
                    extent: 5.0,
                }),
            },
            point: PointLight {
                color: Rgb(0x8b5cf6),
                intensity: 0.5,
                distance: 100.0,
                position: Vec3::new(-5.0, -5.0, 5.0),
            },
            ground: GroundPlane {
                width: 20.0,
                depth: 20.0,
                elevation: -2.0,
                tilt: -FRAC_PI_2,
                shadow_opacity: 0.2,
            },
            antialias: true,
        }
    }

    /// Model matrix of the cube for a pose.
    pub fn cube_transform(&self, pose: &CubePose) -> Mat4 {
        Mat4::from_rotation_translation(pose.rotation(), Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_decode() {
        assert_eq!(Rgb(0xff0000).to_srgb(), [1.0, 0.0, 0.0]);
        let [r, g, b] = Rgb(0x4f46e5).to_srgb();
        assert!((r - 79.0 / 255.0).abs() < 1e-6);
        assert!((g - 70.0 / 255.0).abs() < 1e-6);
        assert!((b - 229.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn linear_conversion_endpoints() {
        assert_eq!(Rgb(0x000000).to_linear(), [0.0, 0.0, 0.0]);
        let white = Rgb::WHITE.to_linear();
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-5));
        let [grey, _, _] = Rgb(0x808080).to_linear();
        assert!(grey > 0.2 && grey < 0.23);
    }

    #[test]
    fn standard_scene_matches_layout() {
        let desc = SceneDesc::standard(Viewport::new(800, 400));
        assert_eq!(desc.camera.aspect, 2.0);
        assert_eq!(desc.cube.size, 2.0);
        assert_eq!(desc.cube.material.metalness, 0.8);
        assert_eq!(desc.directional.shadow.map(|s| s.map_size), Some(2048));
        assert_eq!(desc.ground.elevation, -2.0);
        assert_eq!(desc.point.distance, 100.0);
    }

    #[test]
    fn ground_plane_faces_up() {
        let desc = SceneDesc::standard(Viewport::new(100, 100));
        let normal = desc.ground.transform().transform_vector3(Vec3::Z);
        assert!((normal - Vec3::Y).length() < 1e-5);
        let origin = desc.ground.transform().transform_point3(Vec3::ZERO);
        assert_eq!(origin.y, -2.0);
    }

    #[test]
    fn shadow_camera_sees_the_origin() {
        let desc = SceneDesc::standard(Viewport::new(100, 100));
        let vp = desc.directional.shadow_view_projection().unwrap();
        let clip = vp * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn cube_transform_follows_yaw() {
        let desc = SceneDesc::standard(Viewport::new(100, 100));
        let pose = CubePose {
            yaw: FRAC_PI_2,
            ..CubePose::default()
        };
        let x = desc.cube_transform(&pose).transform_vector3(Vec3::X);
        assert!((x - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }
}
