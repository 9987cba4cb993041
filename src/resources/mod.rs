//! Render resources
//!
//! Shader programs and the immutable render states that bind them.

mod render_state;
mod shader;

pub use render_state::*;
pub use shader::*;
