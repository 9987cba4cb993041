//! Camera components
//!
//! A camera entity carries [`Camera`] plus the per-pass fields consulted
//! during traversal: its visibility mask, the tag it looks node overrides up
//! by, and the state every node it draws starts from.

use crate::resources::RenderState;
use crate::tag_state::BitMask32;
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use std::sync::Arc;

/// Camera projection type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    /// Symmetric orthographic volume, as used by shadow and voxel cameras
    Orthographic {
        width: f32,
        height: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Projection::Orthographic {
                width,
                height,
                near,
                far,
            } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                Mat4::orthographic_rh(-hw, hw, -hh, hh, near, far)
            }
        }
    }
}

/// Marks an entity as a camera.
#[derive(Component, Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            projection: Projection::default(),
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            projection: Projection::default(),
        }
    }

    pub fn orthographic(position: Vec3, target: Vec3, extent: f32, far: f32) -> Self {
        Self {
            position,
            target,
            projection: Projection::Orthographic {
                width: extent,
                height: extent,
                near: 0.1,
                far,
            },
        }
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection.matrix() * Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }
}

/// Pass visibility bits of a camera. A camera without this component sees
/// no pass bits at all.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraMask(pub BitMask32);

/// Tag name the camera uses to look up node overrides.
///
/// `None` is the default (gbuffer) behavior: nodes are drawn with their own
/// appearance.
#[derive(Component, Debug, Clone, PartialEq, Eq, Default)]
pub struct TagStateKey(pub Option<String>);

impl TagStateKey {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// State every node drawn by this camera starts from.
#[derive(Component, Debug, Clone, Default)]
pub struct InitialState(pub Option<Arc<RenderState>>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthographic_camera_projects_center_to_origin() {
        let cam = Camera::orthographic(Vec3::new(0.0, 10.0, 10.0), Vec3::ZERO, 20.0, 50.0);
        let clip = cam.view_projection_matrix().project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-3 && clip.y.abs() < 1e-3);
    }

    #[test]
    fn default_key_is_gbuffer() {
        assert_eq!(TagStateKey::default().as_deref(), None);
        assert!(CameraMask::default().0.is_empty());
    }
}
