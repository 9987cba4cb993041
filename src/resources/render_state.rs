//! Immutable render states
//!
//! A [`RenderState`] bundles the shader binding, draw order and fixed-function
//! toggles a node is drawn with. States are shared behind `Arc` and never
//! modified after construction; every `with_*` call returns a new value.

use super::Shader;
use std::sync::Arc;

/// Priority given to the color-write setting of pass overrides, high enough
/// that node-level color settings below the override cannot re-enable output.
pub const COLOR_WRITE_OVERRIDE_PRIORITY: i32 = 10000;

/// Compare function for depth testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Color channel write flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorWrites(u8);

impl ColorWrites {
    pub const NONE: Self = Self(0);
    pub const RED: Self = Self(1 << 0);
    pub const GREEN: Self = Self(1 << 1);
    pub const BLUE: Self = Self(1 << 2);
    pub const ALPHA: Self = Self(1 << 3);
    pub const COLOR: Self = Self(0b0111);
    pub const ALL: Self = Self(0b1111);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ColorWrites {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Rendering configuration applied to a node
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub shader: Option<Arc<Shader>>,
    /// Draw-order priority of the shader binding
    pub sort: i32,
    pub color_write: ColorWrites,
    pub color_write_priority: i32,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            shader: None,
            sort: 0,
            color_write: ColorWrites::ALL,
            color_write_priority: 0,
            depth_write: true,
            depth_compare: CompareFunction::Less,
        }
    }
}

impl RenderState {
    /// Unconfigured state: no shader, every channel written.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Empty state with color output disabled, for passes that only
    /// produce depth or occupancy data.
    pub fn depth_only() -> Self {
        Self::empty().with_color_write(ColorWrites::NONE, COLOR_WRITE_OVERRIDE_PRIORITY)
    }

    pub fn with_shader(mut self, shader: Arc<Shader>, sort: i32) -> Self {
        self.shader = Some(shader);
        self.sort = sort;
        self
    }

    pub fn with_color_write(mut self, writes: ColorWrites, priority: i32) -> Self {
        self.color_write = writes;
        self.color_write_priority = priority;
        self
    }

    /// Whether `shader` is the exact program bound here.
    pub fn binds(&self, shader: &Arc<Shader>) -> bool {
        self.shader
            .as_ref()
            .is_some_and(|bound| Arc::ptr_eq(bound, shader))
    }

    pub fn writes_color(&self) -> bool {
        !self.color_write.is_none()
    }
}
