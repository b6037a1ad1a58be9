//! Collision-validated auxiliary placement
//!
//! Each auxiliary position is checked against the scene with the host
//! overlaid at its candidate transform before it is accepted. One bad
//! position fails the whole pass; the enclosing command is then rejected
//! without partial application.

use glam::Vec3;

use crate::collision::{CheckOptions, CollisionChecker, analyze};
use crate::command::{Command, CommandKind};
use crate::core::config::EngineConfig;
use crate::core::error::{PlanError, Result};
use crate::core::types::{Axis, EntityId};
use crate::scene::{SceneTree, Transform, keys};

use super::span::span_offsets;
use super::{EntityBuilder, auto_added_children, insert_built, rollback_created};

/// Place `tool` instances at `step` multiples across the host's candidate
/// extent, validating every placement
///
/// Validation runs with the host overlaid at `end`, so the query sees the
/// post-command geometry without mutating it. Returns the created ids or
/// an error after rolling back everything this pass created.
pub fn place_by_collision(
    tree: &mut SceneTree,
    checker: &mut CollisionChecker,
    builder: &dyn EntityBuilder,
    config: &EngineConfig,
    host: EntityId,
    end: &Transform,
    tool: &str,
    axis: Axis,
    step: f32,
) -> Result<Vec<EntityId>> {
    for stale in auto_added_children(tree, host, tool) {
        tree.remove_subtree(stale)?;
    }

    let bounds = tree.get(host)?.bounds;
    let host_bounds = bounds.scaled(end.scale);
    let idx = axis.index();
    let offsets = span_offsets(host_bounds.min[idx], host_bounds.max[idx], step);
    // Offsets are spaced in the host's scaled extent; the local position
    // divides the scale back out because composition applies the parent
    // scale to child positions.
    let axis_scale = end.scale[idx].max(1e-6);
    let overhang_limit = tree
        .get(host)?
        .props
        .overhang(keys::OVERHANG)
        .map(|o| o.limit)
        .unwrap_or(config.default_overhang_limit);

    let mut created = Vec::with_capacity(offsets.len());
    for offset in offsets {
        let mut position = Vec3::ZERO;
        position[idx] = offset / axis_scale;
        position.y = bounds.min.y;
        let placement = Transform::at(position);

        let entity = match builder.build(tool, host, placement) {
            Ok(e) => e,
            Err(err) => {
                rollback_created(tree, &created);
                return Err(err);
            }
        };

        // Overhang of the auxiliary past the host's candidate edge, in
        // the host's scaled frame
        let aux_bounds = entity.scaled_bounds();
        let past_low = (host_bounds.min[idx] - (offset + aux_bounds.min[idx])).max(0.0);
        let past_high = ((offset + aux_bounds.max[idx]) - host_bounds.max[idx]).max(0.0);
        if past_low > overhang_limit || past_high > overhang_limit {
            rollback_created(tree, &created);
            return Err(PlanError::PlacementInvalid {
                tool: tool.to_string(),
                reason: format!("overhang {:.3} exceeds limit {:.3}", past_low.max(past_high), overhang_limit),
            });
        }

        let id = match insert_built(tree, entity) {
            Ok(id) => id,
            Err(err) => {
                rollback_created(tree, &created);
                return Err(err);
            }
        };
        created.push(id);

        let probe = Command::new(CommandKind::Add, id, placement, placement);
        let verdict = checker.with_surrogates(&[(host, *end)], |checker| {
            let hits = checker.check(tree, &probe, CheckOptions::default())?;
            analyze(tree, id, &hits)
        });
        match verdict {
            Ok(result) if result.illegal.is_empty() => {}
            Ok(result) => {
                tracing::debug!(
                    ?host,
                    tool,
                    offset,
                    illegal = result.illegal.len(),
                    "auxiliary placement collides illegally"
                );
                rollback_created(tree, &created);
                return Err(PlanError::PlacementInvalid {
                    tool: tool.to_string(),
                    reason: "illegal collision at candidate position".into(),
                });
            }
            Err(err) => {
                rollback_created(tree, &created);
                return Err(err);
            }
        }
    }
    Ok(created)
}
