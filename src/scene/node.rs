//! Node-side pass data and traversal lookups

use super::{CameraMask, TagStateKey};
use crate::resources::RenderState;
use crate::tag_state::BitMask32;
use bevy_ecs::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-pass state overrides attached to a node, keyed by tag name.
///
/// A missing entry means the node keeps its default appearance under that
/// tag. The states themselves are shared with the pass channel that built
/// them.
#[derive(Component, Debug, Clone, Default)]
pub struct TagStates {
    states: HashMap<String, Arc<RenderState>>,
}

impl TagStates {
    pub fn get(&self, tag_name: &str) -> Option<&Arc<RenderState>> {
        self.states.get(tag_name)
    }

    /// Attach `state` under `tag_name`, replacing any previous override.
    pub fn set(&mut self, tag_name: &str, state: Arc<RenderState>) {
        self.states.insert(tag_name.to_string(), state);
    }

    pub fn clear(&mut self, tag_name: &str) -> Option<Arc<RenderState>> {
        self.states.remove(tag_name)
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }
}

/// Which passes may draw a node. Nodes without it are drawn by every pass.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassMask(pub BitMask32);

impl Default for PassMask {
    fn default() -> Self {
        Self(BitMask32::ALL_ON)
    }
}

impl PassMask {
    #[must_use]
    pub fn hidden_from(self, mask: BitMask32) -> Self {
        Self(self.0.without(mask))
    }

    #[must_use]
    pub fn shown_in(self, mask: BitMask32) -> Self {
        Self(self.0.union(mask))
    }
}

/// Override `camera` uses when drawing `node`.
///
/// Returns `None` when the camera has no lookup key or the node has no
/// override under it, meaning the node is drawn with its own appearance.
pub fn resolve_state(world: &World, camera: Entity, node: Entity) -> Option<Arc<RenderState>> {
    let key = world.get::<TagStateKey>(camera)?.as_deref()?;
    world.get::<TagStates>(node)?.get(key).cloned()
}

/// Whether `camera` draws `node` according to their pass masks.
pub fn is_visible_to(world: &World, camera: Entity, node: Entity) -> bool {
    let camera_mask = world
        .get::<CameraMask>(camera)
        .map_or(BitMask32::ALL_OFF, |m| m.0);
    let node_mask = world.get::<PassMask>(node).copied().unwrap_or_default();
    node_mask.0.intersects(camera_mask)
}
