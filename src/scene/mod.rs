//! Scene components
//!
//! The scene graph is a `bevy_ecs` [`World`](bevy_ecs::world::World): nodes
//! are entities and cameras are entities carrying [`Camera`].

mod camera;
mod node;

pub use camera::*;
pub use node::*;
