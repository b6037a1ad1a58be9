//! Span-based distribution of support children
//!
//! Supports are spread at a fixed interval across the host's length along
//! one axis, with one instance pinned to each end. Final commands remove
//! and regenerate the whole set; transient commands only side-pocket the
//! interior instances so a drag preview stays cheap.

use glam::Vec3;

use crate::core::error::Result;
use crate::core::types::{Axis, EntityId};
use crate::pipeline::GestureState;
use crate::scene::{SceneTree, Transform};

use super::{EntityBuilder, auto_added_children, insert_built, rollback_created};

/// Local offsets for supports across the host's extent along `axis`
///
/// Ends are always covered; interior supports sit at `interval` steps from
/// the low end. A degenerate interval or extent yields the two ends only.
pub fn span_offsets(min: f32, max: f32, interval: f32) -> Vec<f32> {
    let length = max - min;
    if length <= 0.0 {
        return vec![min];
    }
    let mut out = vec![min];
    if interval > 0.0 {
        let mut x = min + interval;
        while x < max - 1e-6 {
            out.push(x);
            x += interval;
        }
    }
    out.push(max);
    out
}

/// Regenerate span supports for `host` using its candidate end transform
///
/// Existing auto-added instances of `tool` are removed first; the new set
/// is placed against the host's scaled extent. Any build failure rolls the
/// whole pass back and restores nothing.
pub fn distribute_span(
    tree: &mut SceneTree,
    builder: &dyn EntityBuilder,
    host: EntityId,
    end: &Transform,
    tool: &str,
    axis: Axis,
    interval: f32,
) -> Result<Vec<EntityId>> {
    for stale in auto_added_children(tree, host, tool) {
        tree.remove_subtree(stale)?;
    }

    let bounds = tree.get(host)?.bounds;
    let scaled = bounds.scaled(end.scale);
    let idx = axis.index();
    let offsets = span_offsets(scaled.min[idx], scaled.max[idx], interval);
    // Offsets are spaced in the host's scaled extent; the local position
    // divides the scale back out because composition applies the parent
    // scale to child positions.
    let axis_scale = end.scale[idx].max(1e-6);

    let mut created = Vec::with_capacity(offsets.len());
    for offset in offsets {
        let mut position = Vec3::ZERO;
        position[idx] = offset / axis_scale;
        position.y = bounds.min.y;
        let entity = match builder.build(tool, host, Transform::at(position)) {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(?host, tool, %err, "span support build failed, rolling back");
                rollback_created(tree, &created);
                return Err(err);
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

/// Transient variant: pull the interior (non-critical) supports out of the
/// tree into the gesture pocket instead of regenerating every frame
///
/// The two end supports stay in place. Once the gesture commits, the final
/// pass regenerates the full set; an abandoned gesture simply drops the
/// pocket with the rest of the gesture state.
pub fn pocket_span_children(
    tree: &mut SceneTree,
    gesture: &mut GestureState,
    host: EntityId,
    tool: &str,
    axis: Axis,
) -> Result<()> {
    let supports = auto_added_children(tree, host, tool);
    if supports.len() <= 2 {
        return Ok(());
    }
    let idx = axis.index();
    let mut sorted = supports;
    sorted.sort_by(|a, b| {
        let pa = tree.get(*a).map(|e| e.transform.position[idx]).unwrap_or(0.0);
        let pb = tree.get(*b).map(|e| e.transform.position[idx]).unwrap_or(0.0);
        pa.total_cmp(&pb)
    });
    // Keep the ends, pocket the interior
    let interior = &sorted[1..sorted.len() - 1];
    let mut pocketed = Vec::with_capacity(interior.len());
    for &id in interior {
        pocketed.extend(tree.remove_subtree(id)?);
    }
    gesture.pocket(host, pocketed);
    Ok(())
}
