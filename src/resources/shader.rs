//! Shader program descriptions

/// A shader program bound into render states.
///
/// Sources are kept as opaque text; compilation and upload happen elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    pub name: String,
    pub vertex_source: String,
    pub fragment_source: Option<String>,
}

impl Shader {
    pub fn new(name: &str, vertex_source: &str) -> Self {
        Self {
            name: name.to_string(),
            vertex_source: vertex_source.to_string(),
            fragment_source: None,
        }
    }

    /// A shader without vertex code cannot be bound.
    pub fn is_valid(&self) -> bool {
        !self.vertex_source.trim().is_empty()
    }
}
