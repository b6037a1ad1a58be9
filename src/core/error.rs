use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Entity not found: {0:?}")]
    EntityNotFound(crate::core::types::EntityId),

    #[error("Entity has no containing zone: {0:?}")]
    MissingZone(crate::core::types::EntityId),

    #[error("Parent chain contains a cycle at: {0:?}")]
    CycleDetected(crate::core::types::EntityId),

    #[error("Malformed property '{key}': {reason}")]
    MalformedProperty { key: String, reason: String },

    #[error("Entity builder failed: {0}")]
    BuildFailed(String),

    #[error("No valid placement for '{tool}': {reason}")]
    PlacementInvalid { tool: String, reason: String },

    #[error("Cannot reparent {child:?} under {parent:?}: {reason}")]
    InvalidReparent {
        child: crate::core::types::EntityId,
        parent: crate::core::types::EntityId,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
