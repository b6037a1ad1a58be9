//! Auto-placement of dependent child entities
//!
//! Hosts carrying an auto-add configuration get support children (e.g.,
//! brackets under a shelf) synthesized in response to scale/move. Three
//! independent strategies exist: span distribution, collision-validated
//! placement, and explicit offset tables. Failure is all-or-nothing: any
//! sub-failure rolls back every auxiliary created in the same pass.

pub mod collision_fit;
pub mod position;
pub mod span;

pub use collision_fit::place_by_collision;
pub use position::place_by_position;
pub use span::{distribute_span, pocket_span_children};

use glam::Vec3;

use crate::core::error::{PlanError, Result};
use crate::core::types::EntityId;
use crate::geom::Aabb;
use crate::scene::{Entity, EntityKind, PropValue, SceneTree, Transform, keys};

/// Builds new entities for auto-placement and model-swap corrections
///
/// The tool catalog lives outside this crate; the engine only asks for an
/// entity by tool name and placement.
pub trait EntityBuilder {
    fn build(&self, tool: &str, parent: EntityId, transform: Transform) -> Result<Entity>;
}

/// Test/headless builder: a small auto-added product classified by its
/// tool name
#[derive(Debug, Default)]
pub struct NullBuilder;

impl EntityBuilder for NullBuilder {
    fn build(&self, tool: &str, parent: EntityId, transform: Transform) -> Result<Entity> {
        let mut entity = Entity::new(EntityKind::Product)
            .with_bounds(Aabb::centered(Vec3::splat(0.1)))
            .with_transform(transform);
        entity.parent = Some(parent);
        entity
            .props
            .set(keys::AUTO_ADDED, PropValue::Bool(true))
            .set(
                keys::CLASSIFICATION,
                PropValue::TextList(vec![tool.to_string()]),
            );
        Ok(entity)
    }
}

/// Remove every auxiliary created in a failed pass, in reverse creation
/// order
pub(crate) fn rollback_created(tree: &mut SceneTree, created: &[EntityId]) {
    for id in created.iter().rev() {
        if tree.contains(*id) {
            if let Err(err) = tree.remove_subtree(*id) {
                tracing::warn!(?id, %err, "rollback of auto-added entity failed");
            }
        }
    }
}

/// Auto-added children of `host` whose classification includes `tool`
pub(crate) fn auto_added_children(tree: &SceneTree, host: EntityId, tool: &str) -> Vec<EntityId> {
    tree.children(host)
        .iter()
        .copied()
        .filter(|&c| {
            tree.get(c)
                .map(|e| {
                    e.is_auto_added() && e.props.classifications().iter().any(|t| t == tool)
                })
                .unwrap_or(false)
        })
        .collect()
}

/// Insert a freshly built auxiliary, propagating builder failures as
/// [`PlanError::BuildFailed`]
pub(crate) fn insert_built(tree: &mut SceneTree, entity: Entity) -> Result<EntityId> {
    if entity.parent.is_none() {
        return Err(PlanError::BuildFailed(
            "auto-added entity must have a parent".into(),
        ));
    }
    tree.insert(entity)
}
