//! Scene model: entities, typed properties, and the arena scene tree

pub mod entity;
pub mod props;
pub mod tree;

pub use entity::{Entity, EntityKind, Transform};
pub use props::{
    AutoAddSpec, AxisSnap, CountModifier, OverhangSpec, PropValue, PropertyBag, RelationshipRule,
    SizeLimits, SnapSpec, StackSpec, keys,
};
pub use tree::SceneTree;
