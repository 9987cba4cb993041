//! Pass Tag States - per-pass render state overrides for multi-pass rendering
//!
//! A renderer that draws the same scene from several passes (shadow maps,
//! scene voxelization) needs each pass to substitute its own shaders and
//! output settings without duplicating the scene graph.
//!
//! # Features
//! - Named, shared render state overrides cached per pass
//! - Overrides attached to scene nodes under a pass tag, looked up by the
//!   cameras rendering that pass
//! - Reversible camera registration with fixed, disjoint pass visibility bits
//! - Scene storage through Bevy ECS

pub mod resources;
pub mod scene;
pub mod tag_state;

// Re-export Bevy ECS prelude for users
pub use bevy_ecs::prelude::*;

pub use resources::{RenderState, Shader};
pub use tag_state::{
    BitMask32, PassChannel, PassKind, TagStateError, TagStateManager, TagStateResult,
};

/// Configuration for the tag state manager
#[derive(Debug, Clone)]
pub struct TagStateConfig {
    /// Tag the shadow pass attaches its overrides under
    pub shadow_tag_name: String,
    /// Tag the voxelize pass attaches its overrides under
    pub voxelize_tag_name: String,
    /// Add the gbuffer bit to the main camera's mask on construction
    pub main_camera_gbuffer: bool,
}

impl Default for TagStateConfig {
    fn default() -> Self {
        Self {
            shadow_tag_name: PassKind::Shadow.tag_name().to_string(),
            voxelize_tag_name: PassKind::Voxelize.tag_name().to_string(),
            main_camera_gbuffer: true,
        }
    }
}

impl TagStateConfig {
    /// Tag names must be non-empty and distinct, otherwise passes would read
    /// each other's overrides.
    pub fn validate(&self) -> TagStateResult<()> {
        if self.shadow_tag_name.is_empty() || self.voxelize_tag_name.is_empty() {
            return Err(TagStateError::InvalidConfig("empty tag name".into()));
        }
        if self.shadow_tag_name == self.voxelize_tag_name {
            return Err(TagStateError::InvalidConfig(format!(
                "tag name '{}' used by more than one pass",
                self.shadow_tag_name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TagStateConfig::default().validate().is_ok());
    }

    #[test]
    fn shared_tag_names_are_rejected() {
        let config = TagStateConfig {
            voxelize_tag_name: "Shadows".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TagStateError::InvalidConfig(_))
        ));
    }
}
