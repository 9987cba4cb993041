use bevy_ecs::entity::Entity;
use thiserror::Error;

/// Tag state error type
///
/// Every variant is a caller contract violation. Registering a camera twice
/// or unregistering an unknown camera is not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagStateError {
    #[error("Node {0:?} does not exist")]
    InvalidNode(Entity),
    #[error("Entity {0:?} is not a live camera")]
    InvalidCamera(Entity),
    #[error("Shader '{0}' has no vertex stage")]
    InvalidShader(String),
    #[error("Tag state name must not be empty")]
    EmptyStateName,
    #[error("Invalid tag state configuration: {0}")]
    InvalidConfig(String),
}

pub type TagStateResult<T> = Result<T, TagStateError>;
