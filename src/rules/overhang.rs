//! Overhang limiting
//!
//! An entity resting on supports may extend past the outermost support
//! edge only up to its configured limit. A violation first tries a scale
//! correction: shrink the entity to the support hull plus the allowed
//! overhang and recenter it between the outermost supports. Only when that
//! is not possible (or not permitted) does the rule reject.

use glam::Vec3;

use crate::collision::CheckOptions;
use crate::command::{Command, CommandKind};
use crate::core::types::Axis;
use crate::pipeline::EvalContext;
use crate::scene::keys;

use super::{NotApprovedAction, Rule, RuleClass, RuleId, RuleOutcome};

/// Horizontal axes an overhang is measured along
const SPAN_AXES: [Axis; 2] = [Axis::X, Axis::Z];

pub struct OverhangRule;

impl Rule for OverhangRule {
    fn id(&self) -> RuleId {
        RuleId::Overhang
    }

    fn class(&self) -> RuleClass {
        RuleClass::Inviolable
    }

    fn applies_to(&self, kind: CommandKind) -> bool {
        matches!(
            kind,
            CommandKind::Move | CommandKind::Scale | CommandKind::Add
        )
    }

    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        _prior: &RuleOutcome,
    ) -> RuleOutcome {
        let spec = match ctx.tree.get(cmd.target) {
            Ok(e) => match e.props.overhang(keys::OVERHANG) {
                Some(spec) => *spec,
                None => return RuleOutcome::approved(),
            },
            Err(_) => return RuleOutcome::approved(),
        };

        // Supports: legal near-contacts under the candidate placement
        let supports = match self.find_supports(ctx, cmd) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(target = ?cmd.target, %err, "support query failed, skipping rule");
                return RuleOutcome::approved();
            }
        };
        if supports.is_empty() {
            return RuleOutcome::approved();
        }

        let (hull_min, hull_max) = match self.support_hull(ctx, &supports) {
            Some(hull) => hull,
            None => return RuleOutcome::approved(),
        };

        let Ok(own) = ctx
            .tree
            .world_bounds_with(cmd.target, &cmd.end)
            .map(|b| b.aabb_in_frame())
        else {
            return RuleOutcome::approved();
        };

        let mut worst = 0.0f32;
        for axis in SPAN_AXES {
            let idx = axis.index();
            worst = worst
                .max(hull_min[idx] - own.0[idx])
                .max(own.1[idx] - hull_max[idx]);
        }
        if worst <= spec.limit + ctx.config.geom_epsilon {
            return RuleOutcome::approved();
        }
        if worst <= spec.limit + ctx.config.edge_tolerance {
            ctx.feedback.status("Item slightly overhangs its support");
            return RuleOutcome::advisory();
        }

        if spec.allow_shrink {
            if let Some(outcome) = self.try_shrink(ctx, cmd, spec.limit, hull_min, hull_max) {
                return outcome;
            }
        }

        if cmd.is_transient() {
            ctx.feedback.status("Item overhangs its support too far");
        } else {
            ctx.feedback.popup("Item overhangs its support too far");
        }
        RuleOutcome::rejected(NotApprovedAction::ResetToStart)
    }
}

impl OverhangRule {
    fn find_supports(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &Command,
    ) -> crate::core::error::Result<Vec<crate::core::types::EntityId>> {
        let hits = ctx.checker.check(
            ctx.tree,
            cmd,
            CheckOptions {
                extended_margin: ctx.config.extended_margin,
                ..CheckOptions::default()
            },
        )?;
        let partition = crate::collision::analyze(ctx.tree, cmd.target, &hits)?;
        Ok(partition.legal)
    }

    /// Combined world-frame extent of the outermost supports
    fn support_hull(
        &self,
        ctx: &EvalContext<'_>,
        supports: &[crate::core::types::EntityId],
    ) -> Option<(Vec3, Vec3)> {
        let mut hull: Option<(Vec3, Vec3)> = None;
        for &id in supports {
            let (min, max) = ctx.tree.world_bounds(id).ok()?.aabb_in_frame();
            hull = Some(match hull {
                None => (min, max),
                Some((hmin, hmax)) => (hmin.min(min), hmax.max(max)),
            });
        }
        hull
    }

    /// Shrink the entity to the support hull plus the allowed overhang and
    /// recenter it between the outermost supports
    fn try_shrink(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        limit: f32,
        hull_min: Vec3,
        hull_max: Vec3,
    ) -> Option<RuleOutcome> {
        let entity = ctx.tree.get(cmd.target).ok()?;
        let base_size = entity.bounds.size();
        let parent_frame = ctx.tree.parent_zone_transform(cmd.target).ok()?;
        if !parent_frame.rotation.is_identity() {
            tracing::warn!(
                target = ?cmd.target,
                "overhang shrink in a rotated parent frame is unsupported, skipping correction"
            );
            return None;
        }

        let mut end = cmd.end;
        let mut changed = false;
        for axis in SPAN_AXES {
            let idx = axis.index();
            if base_size[idx] <= 0.0 {
                continue;
            }
            let allowed = hull_max[idx] - hull_min[idx] + 2.0 * limit;
            let current = base_size[idx] * end.scale[idx];
            if current <= allowed {
                continue;
            }
            if allowed <= 0.0 {
                return None;
            }
            end.scale[idx] = allowed / base_size[idx];
            changed = true;
        }
        if !changed {
            return None;
        }

        // Valid centers for the shrunk extent form a segment along the
        // support hull midline; the closest point on it moves the entity
        // the least. A fully shrunk axis collapses its span to a point.
        let mut seg_a = Vec3::ZERO;
        let mut seg_b = Vec3::ZERO;
        let mut center = Vec3::ZERO;
        for axis in SPAN_AXES {
            let idx = axis.index();
            let half = 0.5 * base_size[idx] * end.scale[idx];
            seg_a[idx] = hull_min[idx] + half - limit;
            seg_b[idx] = hull_max[idx] - half + limit;
            center[idx] = parent_frame.position[idx] + end.position[idx];
        }
        let seated = crate::geom::closest_point_on_segment(center, seg_a, seg_b);
        for axis in SPAN_AXES {
            let idx = axis.index();
            end.position[idx] = seated[idx] - parent_frame.position[idx];
        }
        cmd.end = end;
        tracing::debug!(target = ?cmd.target, "overhang corrected by shrink");
        Some(RuleOutcome::corrected())
    }
}
