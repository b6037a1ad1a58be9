//! Cascading child correction on parent scale
//!
//! Scaling a parent moves its children in zone space, because child
//! positions inherit the parent's scale. This rule keeps every non-auto-add,
//! non-subpart child at its previous world offset by issuing compensating
//! Move side effects, and clamps the parent so it cannot shrink below its
//! children's combined envelope. Wall segments instead offer to delete
//! children stranded by the shrink, gated on a user confirmation.

use crate::command::{Command, CommandKind};
use crate::core::types::{Axis, EntityId};
use crate::geom::Aabb;
use crate::pipeline::EvalContext;
use crate::scene::EntityKind;

use super::{NotApprovedAction, Rule, RuleClass, RuleId, RuleOutcome};

pub struct CascadeRule;

impl Rule for CascadeRule {
    fn id(&self) -> RuleId {
        RuleId::Cascade
    }

    fn class(&self) -> RuleClass {
        RuleClass::Inviolable
    }

    fn applies_to(&self, kind: CommandKind) -> bool {
        matches!(kind, CommandKind::Scale)
    }

    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        _prior: &RuleOutcome,
    ) -> RuleOutcome {
        let (kind, children) = match ctx.tree.get(cmd.target) {
            Ok(entity) => (entity.kind, self.counted_children(ctx, cmd.target)),
            Err(_) => return RuleOutcome::approved(),
        };
        if children.is_empty() {
            return RuleOutcome::approved();
        }

        if kind == EntityKind::SegmentWall {
            return self.handle_stranded(ctx, cmd, &children);
        }

        let mut outcome = RuleOutcome::approved();
        if let Some(envelope) = self.child_envelope(ctx, cmd, &children) {
            if self.clamp_to_envelope(ctx, cmd, &envelope) {
                outcome = RuleOutcome::corrected();
            }
        }

        let side_effects = self.reposition_children(ctx, cmd, &children);
        if !side_effects.is_empty() {
            outcome.corrected = true;
            outcome = outcome.with_side_effects(side_effects);
        }
        outcome
    }
}

impl CascadeRule {
    /// Children subject to cascade: not auto-added, not structural subparts
    fn counted_children(&self, ctx: &EvalContext<'_>, parent: EntityId) -> Vec<EntityId> {
        ctx.tree
            .children(parent)
            .iter()
            .copied()
            .filter(|&c| {
                ctx.tree
                    .get(c)
                    .map(|e| !e.is_auto_added() && !e.is_complex_subpart())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Combined child bounds in the parent's frame, at the children's
    /// current world offsets
    fn child_envelope(
        &self,
        ctx: &EvalContext<'_>,
        cmd: &Command,
        children: &[EntityId],
    ) -> Option<Aabb> {
        let mut envelope: Option<Aabb> = None;
        for &child in children {
            let entity = ctx.tree.get(child).ok()?;
            let world_offset = entity.transform.position * cmd.start.scale;
            let bounds = entity.scaled_bounds();
            let child_box = Aabb::new(bounds.min + world_offset, bounds.max + world_offset);
            envelope = Some(match envelope {
                None => child_box,
                Some(acc) => acc.union(&child_box),
            });
        }
        envelope
    }

    /// Raise the requested scale wherever the children's envelope would no
    /// longer fit, minus the edge tolerance. Returns true when clamped.
    fn clamp_to_envelope(
        &self,
        ctx: &EvalContext<'_>,
        cmd: &mut Command,
        envelope: &Aabb,
    ) -> bool {
        let base = match ctx.tree.get(cmd.target) {
            Ok(e) => e.bounds,
            Err(_) => return false,
        };
        let tol = ctx.config.edge_tolerance;
        let mut clamped = false;
        for axis in Axis::ALL {
            let idx = axis.index();
            let mut needed = 0.0f32;
            if base.max[idx] > 0.0 {
                needed = needed.max((envelope.max[idx] - tol) / base.max[idx]);
            }
            if base.min[idx] < 0.0 {
                needed = needed.max((envelope.min[idx] + tol) / base.min[idx]);
            }
            if cmd.end.scale[idx] < needed - ctx.config.geom_epsilon {
                cmd.end.scale[idx] = needed;
                clamped = true;
            }
        }
        if clamped {
            tracing::debug!(target = ?cmd.target, "parent scale clamped to child envelope");
        }
        clamped
    }

    /// Compensating moves that keep each child's world offset unchanged
    fn reposition_children(
        &self,
        ctx: &EvalContext<'_>,
        cmd: &Command,
        children: &[EntityId],
    ) -> Vec<Command> {
        let mut effects = Vec::new();
        for &child in children {
            let Ok(entity) = ctx.tree.get(child) else {
                continue;
            };
            let old_local = entity.transform.position;
            let mut new_local = old_local;
            let mut changed = false;
            for axis in Axis::ALL {
                let idx = axis.index();
                let new_scale = cmd.end.scale[idx];
                if new_scale.abs() <= ctx.config.geom_epsilon {
                    continue;
                }
                let preserved = old_local[idx] * cmd.start.scale[idx] / new_scale;
                if (preserved - old_local[idx]).abs() > ctx.config.geom_epsilon {
                    new_local[idx] = preserved;
                    changed = true;
                }
            }
            if changed {
                effects.push(Command::move_to(child, entity.transform, new_local));
            }
        }
        effects
    }

    /// Wall-height style shrink: children left outside the new bounds are
    /// deleted after user confirmation, or the whole command is rejected
    fn handle_stranded(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        children: &[EntityId],
    ) -> RuleOutcome {
        let new_bounds = match ctx.tree.get(cmd.target) {
            Ok(e) => e.bounds.scaled(cmd.end.scale),
            Err(_) => return RuleOutcome::approved(),
        };
        let stranded: Vec<EntityId> = children
            .iter()
            .copied()
            .filter(|&c| {
                ctx.tree
                    .get(c)
                    .map(|e| {
                        let world_offset = e.transform.position * cmd.start.scale;
                        let b = e.scaled_bounds();
                        !new_bounds
                            .contains_with_buffer(&b, world_offset, -ctx.config.edge_tolerance)
                    })
                    .unwrap_or(false)
            })
            .collect();
        if stranded.is_empty() {
            return RuleOutcome::approved();
        }

        let prompt = format!(
            "{} item(s) no longer fit on this wall and will be removed. Continue?",
            stranded.len()
        );
        if !ctx.feedback.confirm(&prompt) {
            return RuleOutcome::rejected(NotApprovedAction::ResetToStart);
        }
        let removals = stranded.into_iter().map(Command::remove).collect();
        let mut outcome = RuleOutcome::corrected();
        outcome.side_effects = removals;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::autoplace::NullBuilder;
    use crate::core::config::EngineConfig;
    use crate::feedback::{NullSink, RecordingSink};
    use crate::pipeline::{GestureState, RulePipeline};
    use crate::scene::{Entity, PropValue, SceneTree, Transform, keys};

    fn scene_with(kind: EntityKind) -> (SceneTree, EntityId) {
        let mut tree = SceneTree::new();
        let z = tree
            .insert(
                Entity::new(EntityKind::Zone)
                    .with_bounds(Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0))),
            )
            .unwrap();
        let mut host = Entity::new(kind).with_bounds(Aabb::centered(Vec3::splat(4.0)));
        host.parent = Some(z);
        let host = tree.insert(host).unwrap();
        (tree, host)
    }

    fn child_at(tree: &mut SceneTree, parent: EntityId, pos: Vec3) -> EntityId {
        let mut e = Entity::new(EntityKind::Product)
            .with_bounds(Aabb::centered(Vec3::splat(0.5)))
            .with_transform(Transform::at(pos));
        e.parent = Some(parent);
        tree.insert(e).unwrap()
    }

    fn eval(
        tree: &mut SceneTree,
        sink: &RecordingSink,
        cmd: &mut Command,
    ) -> RuleOutcome {
        let mut gesture = GestureState::new();
        let config = EngineConfig::default();
        let mut ctx = EvalContext::new(tree, &mut gesture, sink, &NullBuilder, &config);
        CascadeRule.evaluate(&mut ctx, cmd, &RuleOutcome::approved())
    }

    #[test]
    fn test_children_keep_world_offset() {
        let (mut tree, host) = scene_with(EntityKind::Product);
        let child = child_at(&mut tree, host, Vec3::new(1.0, 0.0, 0.0));
        let mut cmd = Command::scale_to(host, Transform::IDENTITY, Vec3::new(2.0, 1.0, 1.0));
        let sink = RecordingSink::new();
        let outcome = eval(&mut tree, &sink, &mut cmd);
        assert!(outcome.corrected);
        assert_eq!(outcome.side_effects.len(), 1);
        let effect = &outcome.side_effects[0];
        assert_eq!(effect.target, child);
        // Old world offset 1.0 * 1.0; at scale 2 the local must halve
        assert!((effect.end.position.x - 0.5).abs() < 1e-5);

        // World offset after commit matches the old one
        RulePipeline::commit(&mut tree, &cmd, outcome.side_effects).unwrap();
        let world = tree.get(child).unwrap().transform.position.x
            * tree.get(host).unwrap().transform.scale.x;
        assert!((world - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shrink_clamped_to_child_envelope() {
        let (mut tree, host) = scene_with(EntityKind::Product);
        // Child out at x = 1.5, half extent 0.25: envelope max 1.75
        child_at(&mut tree, host, Vec3::new(1.5, 0.0, 0.0));
        let mut cmd = Command::scale_to(host, Transform::IDENTITY, Vec3::new(0.25, 1.0, 1.0));
        let sink = RecordingSink::new();
        let outcome = eval(&mut tree, &sink, &mut cmd);
        assert!(outcome.corrected);
        // Needed: (1.75 - 0.01) / 2.0
        assert!((cmd.end.scale.x - (1.74 / 2.0)).abs() < 1e-4);
    }

    #[test]
    fn test_auto_added_children_exempt() {
        let (mut tree, host) = scene_with(EntityKind::Product);
        let bracket = child_at(&mut tree, host, Vec3::new(1.0, 0.0, 0.0));
        tree.get_mut(bracket)
            .unwrap()
            .props
            .set(keys::AUTO_ADDED, PropValue::Bool(true));
        let mut cmd = Command::scale_to(host, Transform::IDENTITY, Vec3::new(2.0, 1.0, 1.0));
        let sink = RecordingSink::new();
        let outcome = eval(&mut tree, &sink, &mut cmd);
        assert!(!outcome.corrected);
        assert!(outcome.side_effects.is_empty());
    }

    #[test]
    fn test_wall_shrink_confirmed_removes_stranded() {
        let (mut tree, wall) = scene_with(EntityKind::SegmentWall);
        let high = child_at(&mut tree, wall, Vec3::new(0.0, 1.8, 0.0));
        let _low = child_at(&mut tree, wall, Vec3::new(0.0, 0.0, 0.0));
        // Halve the wall height: the high child falls outside
        let mut cmd = Command::scale_to(wall, Transform::IDENTITY, Vec3::new(1.0, 0.5, 1.0));
        let sink = RecordingSink::new();
        let outcome = eval(&mut tree, &sink, &mut cmd);
        assert!(outcome.approved);
        assert_eq!(outcome.side_effects.len(), 1);
        assert_eq!(outcome.side_effects[0].target, high);
        assert_eq!(outcome.side_effects[0].kind, CommandKind::RemoveChild);
        assert_eq!(sink.confirms.borrow().len(), 1);
    }

    #[test]
    fn test_wall_shrink_declined_rejects() {
        let (mut tree, wall) = scene_with(EntityKind::SegmentWall);
        child_at(&mut tree, wall, Vec3::new(0.0, 1.8, 0.0));
        let mut cmd = Command::scale_to(wall, Transform::IDENTITY, Vec3::new(1.0, 0.5, 1.0));
        let sink = RecordingSink::declining();
        let outcome = eval(&mut tree, &sink, &mut cmd);
        assert!(!outcome.approved);
        assert_eq!(outcome.action, NotApprovedAction::ResetToStart);
    }

    #[test]
    fn test_no_children_no_op() {
        let (mut tree, host) = scene_with(EntityKind::Product);
        let mut cmd = Command::scale_to(host, Transform::IDENTITY, Vec3::splat(0.1));
        let outcome = {
            let mut gesture = GestureState::new();
            let config = EngineConfig::default();
            let mut ctx =
                EvalContext::new(&mut tree, &mut gesture, &NullSink, &NullBuilder, &config);
            CascadeRule.evaluate(&mut ctx, &mut cmd, &RuleOutcome::approved())
        };
        assert!(!outcome.corrected);
    }
}
