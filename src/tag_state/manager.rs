//! Tag state manager

use super::{
    BitMask32, PassChannel, PassKind, TagStateError, TagStateResult, GBUFFER_MASK, SHADOW_MASK,
    VOXELIZE_MASK,
};
use crate::resources::{RenderState, Shader};
use crate::scene::{Camera, CameraMask};
use crate::TagStateConfig;
use bevy_ecs::prelude::*;
use std::sync::Arc;

/// Owns one [`PassChannel`] per pass kind and dispatches to it.
///
/// All calls are expected during setup or reconfiguration, never while a
/// traversal reads node overrides.
#[derive(Resource, Debug)]
pub struct TagStateManager {
    shadow: PassChannel,
    voxelize: PassChannel,
    main_camera: Entity,
}

impl TagStateManager {
    pub fn new(world: &mut World, main_camera: Entity) -> TagStateResult<Self> {
        Self::with_config(world, main_camera, TagStateConfig::default())
    }

    pub fn with_config(
        world: &mut World,
        main_camera: Entity,
        config: TagStateConfig,
    ) -> TagStateResult<Self> {
        config.validate()?;
        if world.get::<Camera>(main_camera).is_none() {
            return Err(TagStateError::InvalidCamera(main_camera));
        }

        if config.main_camera_gbuffer {
            let mask = world
                .get::<CameraMask>(main_camera)
                .copied()
                .unwrap_or_default();
            world
                .entity_mut(main_camera)
                .insert(CameraMask(mask.0 | GBUFFER_MASK));
        }

        log::debug!(
            "Tag states: shadow tag '{}', voxelize tag '{}'",
            config.shadow_tag_name,
            config.voxelize_tag_name
        );

        Ok(Self {
            shadow: PassChannel::new(PassKind::Shadow, &config.shadow_tag_name),
            voxelize: PassChannel::new(PassKind::Voxelize, &config.voxelize_tag_name),
            main_camera,
        })
    }

    /// Bit of the default (gbuffer) pass
    pub const fn gbuffer_mask() -> BitMask32 {
        GBUFFER_MASK
    }

    pub const fn shadow_mask() -> BitMask32 {
        SHADOW_MASK
    }

    pub const fn voxelize_mask() -> BitMask32 {
        VOXELIZE_MASK
    }

    pub fn main_camera(&self) -> Entity {
        self.main_camera
    }

    pub fn channel(&self, kind: PassKind) -> &PassChannel {
        match kind {
            PassKind::Shadow => &self.shadow,
            PassKind::Voxelize => &self.voxelize,
        }
    }

    pub fn channel_mut(&mut self, kind: PassKind) -> &mut PassChannel {
        match kind {
            PassKind::Shadow => &mut self.shadow,
            PassKind::Voxelize => &mut self.voxelize,
        }
    }

    pub fn apply_state(
        &mut self,
        kind: PassKind,
        world: &mut World,
        node: Entity,
        shader: &Arc<Shader>,
        name: &str,
        sort: i32,
    ) -> TagStateResult<Arc<RenderState>> {
        self.channel_mut(kind)
            .apply_state(world, node, shader, name, sort)
    }

    pub fn apply_shadow_state(
        &mut self,
        world: &mut World,
        node: Entity,
        shader: &Arc<Shader>,
        name: &str,
        sort: i32,
    ) -> TagStateResult<Arc<RenderState>> {
        self.apply_state(PassKind::Shadow, world, node, shader, name, sort)
    }

    pub fn apply_voxelize_state(
        &mut self,
        world: &mut World,
        node: Entity,
        shader: &Arc<Shader>,
        name: &str,
        sort: i32,
    ) -> TagStateResult<Arc<RenderState>> {
        self.apply_state(PassKind::Voxelize, world, node, shader, name, sort)
    }

    pub fn register_camera(
        &mut self,
        kind: PassKind,
        world: &mut World,
        camera: Entity,
    ) -> TagStateResult<()> {
        self.channel_mut(kind).register_camera(world, camera)
    }

    pub fn unregister_camera(
        &mut self,
        kind: PassKind,
        world: &mut World,
        camera: Entity,
    ) -> TagStateResult<()> {
        let Some(handoff) = self.channel_mut(kind).detach_camera(world, camera)? else {
            return Ok(());
        };
        for other in PassKind::ALL.into_iter().filter(|&other| other != kind) {
            self.channel_mut(other).inherit_restore(camera, &handoff);
        }
        Ok(())
    }

    pub fn register_shadow_camera(&mut self, world: &mut World, camera: Entity) -> TagStateResult<()> {
        self.register_camera(PassKind::Shadow, world, camera)
    }

    pub fn unregister_shadow_camera(
        &mut self,
        world: &mut World,
        camera: Entity,
    ) -> TagStateResult<()> {
        self.unregister_camera(PassKind::Shadow, world, camera)
    }

    pub fn register_voxelize_camera(
        &mut self,
        world: &mut World,
        camera: Entity,
    ) -> TagStateResult<()> {
        self.register_camera(PassKind::Voxelize, world, camera)
    }

    pub fn unregister_voxelize_camera(
        &mut self,
        world: &mut World,
        camera: Entity,
    ) -> TagStateResult<()> {
        self.unregister_camera(PassKind::Voxelize, world, camera)
    }

    /// Clear every channel's cache and detach all overrides.
    pub fn cleanup_states(&mut self, world: &mut World) {
        for kind in PassKind::ALL {
            self.channel_mut(kind).cleanup_states(world);
        }
    }

    /// Drop registrations of despawned cameras from every channel.
    pub fn prune_cameras(&mut self, world: &World) {
        for kind in PassKind::ALL {
            self.channel_mut(kind).retain_live_cameras(world);
        }
    }
}
