//! Offset-table child placement
//!
//! The simplest auto-add strategy: children go exactly where the host's
//! property data says, no span math. Malformed table entries are logged
//! and skipped so one bad row does not take down the whole pipeline.

use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::scene::{SceneTree, Transform};

use glam::Vec3;

use super::{EntityBuilder, auto_added_children, insert_built, rollback_created};

/// Place `tool` children at the given local offsets
///
/// Previously auto-added instances of the same tool are replaced. A build
/// failure for one offset is a data-integrity gap: that offset is skipped
/// with a warning. Only an insertion failure (tree-level inconsistency)
/// aborts and rolls back the pass.
pub fn place_by_position(
    tree: &mut SceneTree,
    builder: &dyn EntityBuilder,
    host: EntityId,
    offsets: &[Vec3],
    tool: &str,
) -> Result<Vec<EntityId>> {
    for stale in auto_added_children(tree, host, tool) {
        tree.remove_subtree(stale)?;
    }

    let mut created = Vec::with_capacity(offsets.len());
    for (row, offset) in offsets.iter().enumerate() {
        if !offset.is_finite() {
            tracing::warn!(?host, tool, row, "non-finite offset in position table, skipping");
            continue;
        }
        let entity = match builder.build(tool, host, Transform::at(*offset)) {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(?host, tool, row, %err, "position-table build failed, skipping row");
                continue;
            }
        };
        match insert_built(tree, entity) {
            Ok(id) => created.push(id),
            Err(err) => {
                rollback_created(tree, &created);
                return Err(err);
            }
        }
    }
    Ok(created)
}
