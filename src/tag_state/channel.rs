//! Pass channels
//!
//! A [`PassChannel`] owns the cached state overrides of one pass and the
//! cameras currently rendering it. Overrides are cached by caller-chosen
//! name, so many nodes can share one state object.

use super::{BitMask32, PassKind, TagStateError, TagStateResult};
use crate::resources::{RenderState, Shader};
use crate::scene::{Camera, CameraMask, InitialState, TagStateKey, TagStates};
use bevy_ecs::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// What a camera looked like before it joined the channel
#[derive(Debug, Clone)]
struct CameraRegistration {
    camera: Entity,
    had_mask_bit: bool,
    previous_key: TagStateKey,
    previous_initial: InitialState,
}

/// Snapshot parts a channel could not restore on unregister because another
/// channel had taken the camera over since
#[derive(Debug, Clone)]
pub(crate) struct RestoreHandoff {
    tag_name: String,
    initial_state: Arc<RenderState>,
    key: Option<TagStateKey>,
    initial: Option<InitialState>,
}

/// Override cache and camera registry of a single pass
#[derive(Debug)]
pub struct PassChannel {
    kind: PassKind,
    tag_name: String,
    cameras: Vec<CameraRegistration>,
    tag_states: HashMap<String, Arc<RenderState>>,
    attached_nodes: HashSet<Entity>,
    initial_state: Arc<RenderState>,
}

impl PassChannel {
    pub fn new(kind: PassKind, tag_name: &str) -> Self {
        let initial_state = if kind.is_depth_only() {
            RenderState::depth_only()
        } else {
            RenderState::empty()
        };
        Self {
            kind,
            tag_name: tag_name.to_string(),
            cameras: Vec::new(),
            tag_states: HashMap::new(),
            attached_nodes: HashSet::new(),
            initial_state: Arc::new(initial_state),
        }
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn mask(&self) -> BitMask32 {
        self.kind.mask()
    }

    /// Registered cameras, in registration order
    pub fn cameras(&self) -> impl Iterator<Item = Entity> + '_ {
        self.cameras.iter().map(|r| r.camera)
    }

    pub fn contains_camera(&self, camera: Entity) -> bool {
        self.cameras.iter().any(|r| r.camera == camera)
    }

    pub fn cached_state(&self, name: &str) -> Option<&Arc<RenderState>> {
        self.tag_states.get(name)
    }

    pub fn cached_state_count(&self) -> usize {
        self.tag_states.len()
    }

    /// Nodes that received an override since the last cleanup
    pub fn attached_nodes(&self) -> impl Iterator<Item = Entity> + '_ {
        self.attached_nodes.iter().copied()
    }

    /// Attach the state cached under `name` to `node`, building it from
    /// `shader` and `sort` on first use.
    ///
    /// The first call for a name decides the cached state. Later calls with
    /// the same name reuse it as is, whatever shader or sort they pass; a
    /// changed configuration needs a new name or a [`cleanup_states`] first.
    ///
    /// [`cleanup_states`]: PassChannel::cleanup_states
    pub fn apply_state(
        &mut self,
        world: &mut World,
        node: Entity,
        shader: &Arc<Shader>,
        name: &str,
        sort: i32,
    ) -> TagStateResult<Arc<RenderState>> {
        if !world.entities().contains(node) {
            return Err(TagStateError::InvalidNode(node));
        }
        if !shader.is_valid() {
            return Err(TagStateError::InvalidShader(shader.name.clone()));
        }
        if name.is_empty() {
            return Err(TagStateError::EmptyStateName);
        }

        let state = match self.tag_states.get(name) {
            Some(state) => {
                if !state.binds(shader) || state.sort != sort {
                    log::debug!(
                        "{} state '{}' already cached, ignoring shader '{}' with sort {}",
                        self.kind,
                        name,
                        shader.name,
                        sort
                    );
                }
                state.clone()
            }
            None => {
                let state = Arc::new(self.build_state(shader, sort));
                log::trace!(
                    "Built {} state '{}' (shader '{}', sort {})",
                    self.kind,
                    name,
                    shader.name,
                    sort
                );
                self.tag_states.insert(name.to_string(), state.clone());
                state
            }
        };

        if !world.entity(node).contains::<TagStates>() {
            world.entity_mut(node).insert(TagStates::default());
        }
        if let Some(mut states) = world.get_mut::<TagStates>(node) {
            states.set(&self.tag_name, state.clone());
        }
        self.attached_nodes.insert(node);

        Ok(state)
    }

    fn build_state(&self, shader: &Arc<Shader>, sort: i32) -> RenderState {
        let base = if self.kind.is_depth_only() {
            RenderState::depth_only()
        } else {
            RenderState::empty()
        };
        base.with_shader(shader.clone(), sort)
    }

    /// Drop every cached state and detach this channel's overrides from the
    /// nodes that received them. Cameras stay registered.
    pub fn cleanup_states(&mut self, world: &mut World) {
        let mut detached = 0;
        for node in self.attached_nodes.drain() {
            if !world.entities().contains(node) {
                continue;
            }
            let now_empty = match world.get_mut::<TagStates>(node) {
                Some(mut states) => {
                    if states.clear(&self.tag_name).is_some() {
                        detached += 1;
                    }
                    states.is_empty()
                }
                None => false,
            };
            if now_empty {
                world.entity_mut(node).remove::<TagStates>();
            }
        }

        log::info!(
            "Cleaned up {} {} states, detached from {} nodes",
            self.tag_states.len(),
            self.kind,
            detached
        );
        self.tag_states.clear();
    }

    /// Make `camera` render this pass: add the pass bit to its mask and point
    /// its lookup key at this channel's tag.
    pub fn register_camera(&mut self, world: &mut World, camera: Entity) -> TagStateResult<()> {
        ensure_camera(world, camera)?;
        if self.contains_camera(camera) {
            log::debug!("Camera {:?} already registered to {} pass", camera, self.kind);
            return Ok(());
        }

        let mask = world.get::<CameraMask>(camera).copied().unwrap_or_default();
        let key = world.get::<TagStateKey>(camera).cloned().unwrap_or_default();
        let initial = world.get::<InitialState>(camera).cloned().unwrap_or_default();
        if let Some(other) = key.as_deref() {
            log::warn!(
                "Camera {:?} switches lookup key from '{}' to '{}'",
                camera,
                other,
                self.tag_name
            );
        }

        self.cameras.push(CameraRegistration {
            camera,
            had_mask_bit: mask.0.contains(self.mask()),
            previous_key: key,
            previous_initial: initial,
        });
        world.entity_mut(camera).insert((
            CameraMask(mask.0 | self.mask()),
            TagStateKey(Some(self.tag_name.clone())),
            InitialState(Some(self.initial_state.clone())),
        ));
        Ok(())
    }

    /// Undo [`register_camera`](PassChannel::register_camera), restoring the
    /// camera's mask bit, lookup key and initial state.
    ///
    /// The key and initial state are only restored while they still belong
    /// to this channel, so another channel that took the camera over keeps it.
    /// For cameras registered to several channels use
    /// [`TagStateManager::unregister_camera`](super::TagStateManager::unregister_camera),
    /// which hands the unrestored values on to the channel that took over.
    pub fn unregister_camera(&mut self, world: &mut World, camera: Entity) -> TagStateResult<()> {
        self.detach_camera(world, camera).map(|_| ())
    }

    pub(crate) fn detach_camera(
        &mut self,
        world: &mut World,
        camera: Entity,
    ) -> TagStateResult<Option<RestoreHandoff>> {
        ensure_camera(world, camera)?;
        let Some(index) = self.cameras.iter().position(|r| r.camera == camera) else {
            log::debug!("Camera {:?} is not registered to {} pass", camera, self.kind);
            return Ok(None);
        };
        let registration = self.cameras.remove(index);

        let mask = world.get::<CameraMask>(camera).copied().unwrap_or_default().0;
        let restored = if registration.had_mask_bit {
            mask | self.mask()
        } else {
            mask.without(self.mask())
        };
        let owns_key = world
            .get::<TagStateKey>(camera)
            .is_some_and(|key| key.as_deref() == Some(self.tag_name.as_str()));
        let owns_initial = world
            .get::<InitialState>(camera)
            .and_then(|initial| initial.0.as_ref())
            .is_some_and(|state| Arc::ptr_eq(state, &self.initial_state));

        let mut handoff = RestoreHandoff {
            tag_name: self.tag_name.clone(),
            initial_state: self.initial_state.clone(),
            key: None,
            initial: None,
        };
        let mut entity = world.entity_mut(camera);
        entity.insert(CameraMask(restored));
        if owns_key {
            entity.insert(registration.previous_key);
        } else {
            handoff.key = Some(registration.previous_key);
        }
        if owns_initial {
            entity.insert(registration.previous_initial);
        } else {
            handoff.initial = Some(registration.previous_initial);
        }

        if handoff.key.is_none() && handoff.initial.is_none() {
            Ok(None)
        } else {
            Ok(Some(handoff))
        }
    }

    /// Take over what a channel the camera just left could not restore.
    ///
    /// If this channel's snapshot of `camera` points at the leaving channel,
    /// it is replaced with the leaving channel's own snapshot, so unregistering
    /// here later restores the values from before either registration.
    pub(crate) fn inherit_restore(&mut self, camera: Entity, handoff: &RestoreHandoff) {
        let Some(registration) = self.cameras.iter_mut().find(|r| r.camera == camera) else {
            return;
        };
        if let Some(key) = &handoff.key {
            if registration.previous_key.as_deref() == Some(handoff.tag_name.as_str()) {
                registration.previous_key = key.clone();
            }
        }
        if let Some(initial) = &handoff.initial {
            let points_at_leaver = registration
                .previous_initial
                .0
                .as_ref()
                .is_some_and(|state| Arc::ptr_eq(state, &handoff.initial_state));
            if points_at_leaver {
                registration.previous_initial = initial.clone();
            }
        }
    }

    /// Forget cameras that were despawned while registered.
    pub fn retain_live_cameras(&mut self, world: &World) {
        let kind = self.kind;
        self.cameras.retain(|registration| {
            let live = world.entities().contains(registration.camera);
            if !live {
                log::warn!(
                    "Dropping despawned camera {:?} from {} pass",
                    registration.camera,
                    kind
                );
            }
            live
        });
    }
}

fn ensure_camera(world: &World, camera: Entity) -> TagStateResult<()> {
    if world.get::<Camera>(camera).is_some() {
        Ok(())
    } else {
        Err(TagStateError::InvalidCamera(camera))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ColorWrites;
    use crate::scene::resolve_state;
    use crate::tag_state::{GBUFFER_MASK, SHADOW_MASK, VOXELIZE_MASK};

    fn shader(name: &str) -> Arc<Shader> {
        Arc::new(Shader::new(name, "void main() {}"))
    }

    fn shadow_channel() -> PassChannel {
        PassChannel::new(PassKind::Shadow, "Shadows")
    }

    #[test]
    fn builds_depth_only_state() {
        let mut world = World::new();
        let node = world.spawn_empty().id();
        let mut channel = shadow_channel();
        let shadow = shader("shadow");

        let state = channel
            .apply_state(&mut world, node, &shadow, "default", 10)
            .unwrap();

        assert!(state.binds(&shadow));
        assert_eq!(state.sort, 10);
        assert_eq!(state.color_write, ColorWrites::NONE);
        let attached = world.get::<TagStates>(node).unwrap().get("Shadows").unwrap();
        assert!(Arc::ptr_eq(attached, &state));
        assert_eq!(channel.cached_state_count(), 1);
    }

    #[test]
    fn first_writer_wins() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let mut channel = shadow_channel();
        let shader_a = shader("a");
        let shader_b = shader("b");

        let first = channel.apply_state(&mut world, a, &shader_a, "grp", 10).unwrap();
        let second = channel.apply_state(&mut world, b, &shader_b, "grp", 20).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.binds(&shader_a));
        assert_eq!(second.sort, 10);
        assert_eq!(channel.cached_state_count(), 1);
    }

    #[test]
    fn rejects_invalid_inputs() {
        let mut world = World::new();
        let node = world.spawn_empty().id();
        let gone = world.spawn_empty().id();
        world.despawn(gone);
        let mut channel = shadow_channel();

        assert_eq!(
            channel.apply_state(&mut world, gone, &shader("s"), "x", 0),
            Err(TagStateError::InvalidNode(gone))
        );
        let blank = Arc::new(Shader::new("blank", ""));
        assert_eq!(
            channel.apply_state(&mut world, node, &blank, "x", 0),
            Err(TagStateError::InvalidShader("blank".into()))
        );
        assert_eq!(
            channel.apply_state(&mut world, node, &shader("s"), "", 0),
            Err(TagStateError::EmptyStateName)
        );
        assert_eq!(channel.cached_state_count(), 0);
        assert!(world.get::<TagStates>(node).is_none());
    }

    #[test]
    fn cleanup_detaches_and_rebuilds() {
        let mut world = World::new();
        let node = world.spawn_empty().id();
        let mut channel = shadow_channel();
        let s = shader("s");

        let old = channel.apply_state(&mut world, node, &s, "default", 1).unwrap();
        channel.cleanup_states(&mut world);

        assert_eq!(channel.cached_state_count(), 0);
        assert!(world.get::<TagStates>(node).is_none());
        assert_eq!(channel.attached_nodes().count(), 0);

        let new = channel.apply_state(&mut world, node, &s, "default", 1).unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(*old, *new);
    }

    #[test]
    fn later_name_replaces_override_on_same_node() {
        let mut world = World::new();
        let node = world.spawn_empty().id();
        let mut channel = shadow_channel();
        let s = shader("s");

        let opaque = channel.apply_state(&mut world, node, &s, "opaque", 0).unwrap();
        let masked = channel.apply_state(&mut world, node, &s, "masked", 5).unwrap();

        assert!(!Arc::ptr_eq(&opaque, &masked));
        let states = world.get::<TagStates>(node).unwrap();
        assert_eq!(states.len(), 1);
        assert!(Arc::ptr_eq(states.get("Shadows").unwrap(), &masked));
        assert_eq!(channel.cached_state_count(), 2);
        assert_eq!(channel.attached_nodes().count(), 1);

        channel.cleanup_states(&mut world);
        assert!(world.get::<TagStates>(node).is_none());
        assert_eq!(channel.cached_state_count(), 0);
    }

    #[test]
    fn cleanup_keeps_other_tags_and_skips_despawned_nodes() {
        let mut world = World::new();
        let kept = world.spawn_empty().id();
        let gone = world.spawn_empty().id();
        let mut shadows = shadow_channel();
        let mut voxels = PassChannel::new(PassKind::Voxelize, "Voxelize");
        let s = shader("s");

        shadows.apply_state(&mut world, kept, &s, "n", 0).unwrap();
        shadows.apply_state(&mut world, gone, &s, "n", 0).unwrap();
        voxels.apply_state(&mut world, kept, &s, "n", 0).unwrap();
        world.despawn(gone);

        shadows.cleanup_states(&mut world);

        let states = world.get::<TagStates>(kept).unwrap();
        assert!(states.get("Shadows").is_none());
        assert!(states.get("Voxelize").is_some());
        assert_eq!(voxels.cached_state_count(), 1);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut world = World::new();
        let camera = world.spawn(Camera::default()).id();
        let mut channel = shadow_channel();

        channel.register_camera(&mut world, camera).unwrap();
        let mask = *world.get::<CameraMask>(camera).unwrap();
        channel.register_camera(&mut world, camera).unwrap();

        assert_eq!(channel.cameras().count(), 1);
        assert_eq!(*world.get::<CameraMask>(camera).unwrap(), mask);
        assert!(mask.0.contains(SHADOW_MASK));
        assert_eq!(
            world.get::<TagStateKey>(camera).unwrap().as_deref(),
            Some("Shadows")
        );
    }

    #[test]
    fn unregister_restores_previous_values() {
        let mut world = World::new();
        let camera = world
            .spawn((Camera::default(), CameraMask(GBUFFER_MASK | VOXELIZE_MASK)))
            .id();
        let mut channel = shadow_channel();

        channel.register_camera(&mut world, camera).unwrap();
        let initial = world.get::<InitialState>(camera).unwrap().0.clone().unwrap();
        assert!(!initial.writes_color());

        channel.unregister_camera(&mut world, camera).unwrap();
        assert_eq!(
            world.get::<CameraMask>(camera).unwrap().0,
            GBUFFER_MASK | VOXELIZE_MASK
        );
        assert_eq!(world.get::<TagStateKey>(camera).unwrap().as_deref(), None);
        assert!(world.get::<InitialState>(camera).unwrap().0.is_none());
        assert!(!channel.contains_camera(camera));
    }

    #[test]
    fn unregistering_unknown_camera_is_noop() {
        let mut world = World::new();
        let camera = world.spawn((Camera::default(), CameraMask(GBUFFER_MASK))).id();
        let mut channel = shadow_channel();

        channel.unregister_camera(&mut world, camera).unwrap();
        assert_eq!(world.get::<CameraMask>(camera).unwrap().0, GBUFFER_MASK);
    }

    #[test]
    fn non_camera_entities_are_rejected() {
        let mut world = World::new();
        let node = world.spawn_empty().id();
        let mut channel = shadow_channel();

        assert_eq!(
            channel.register_camera(&mut world, node),
            Err(TagStateError::InvalidCamera(node))
        );
        assert_eq!(
            channel.unregister_camera(&mut world, node),
            Err(TagStateError::InvalidCamera(node))
        );
    }

    #[test]
    fn registered_camera_sees_overrides() {
        let mut world = World::new();
        let camera = world.spawn(Camera::default()).id();
        let node = world.spawn_empty().id();
        let mut channel = shadow_channel();
        let s = shader("s");

        let state = channel.apply_state(&mut world, node, &s, "default", 3).unwrap();
        assert!(resolve_state(&world, camera, node).is_none());

        channel.register_camera(&mut world, camera).unwrap();
        let resolved = resolve_state(&world, camera, node).unwrap();
        assert!(Arc::ptr_eq(&resolved, &state));
    }

    #[test]
    fn despawned_cameras_are_pruned() {
        let mut world = World::new();
        let live = world.spawn(Camera::default()).id();
        let dead = world.spawn(Camera::default()).id();
        let mut channel = shadow_channel();

        channel.register_camera(&mut world, live).unwrap();
        channel.register_camera(&mut world, dead).unwrap();
        world.despawn(dead);
        channel.retain_live_cameras(&world);

        assert_eq!(channel.cameras().collect::<Vec<_>>(), vec![live]);
    }
}
