//! Per-pass tag states
//!
//! Passes such as shadow mapping and voxelization traverse the same scene as
//! the main camera but need different shaders and output settings. Instead
//! of duplicating the scene, each pass attaches cached state overrides to
//! nodes under its tag name, and cameras rendering the pass look overrides up
//! by that tag.

mod channel;
mod error;
mod manager;
mod mask;

pub use channel::*;
pub use error::*;
pub use manager::*;
pub use mask::*;
