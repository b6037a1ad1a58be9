//! Stacking onto compatible targets
//!
//! An entity declaring stack targets searches its current collisions for a
//! matching classification in the same zone. On a sufficient footprint
//! overlap the candidate is re-parented onto the target and seated on its
//! top face; otherwise normal placement rules apply unchanged.

use crate::collision::CheckOptions;
use crate::command::{Command, CommandKind};
use crate::core::types::EntityId;
use crate::pipeline::EvalContext;
use crate::scene::keys;

use super::{Rule, RuleClass, RuleId, RuleOutcome};

pub struct StackingRule;

impl Rule for StackingRule {
    fn id(&self) -> RuleId {
        RuleId::Stacking
    }

    fn class(&self) -> RuleClass {
        RuleClass::Standard
    }

    fn applies_to(&self, kind: CommandKind) -> bool {
        matches!(
            kind,
            CommandKind::Move | CommandKind::Add | CommandKind::Reparent
        )
    }

    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        _prior: &RuleOutcome,
    ) -> RuleOutcome {
        let spec = match ctx.tree.get(cmd.target) {
            Ok(e) => match e.props.stack(keys::STACK) {
                Some(spec) => spec.clone(),
                None => return RuleOutcome::approved(),
            },
            Err(_) => return RuleOutcome::approved(),
        };
        let min_overlap = spec.min_overlap.unwrap_or(ctx.config.min_stack_overlap);

        let target = match self.find_target(ctx, cmd, &spec.targets, min_overlap) {
            Ok(Some(target)) => target,
            Ok(None) => return RuleOutcome::approved(),
            Err(err) => {
                tracing::warn!(target = ?cmd.target, %err, "stack query failed, skipping rule");
                return RuleOutcome::approved();
            }
        };

        let Some(()) = self.seat_on(ctx, cmd, target) else {
            return RuleOutcome::approved();
        };
        tracing::debug!(entity = ?cmd.target, onto = ?target, "stacked");
        RuleOutcome::corrected()
    }
}

impl StackingRule {
    fn find_target(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &Command,
        wanted: &[String],
        min_overlap: f32,
    ) -> crate::core::error::Result<Option<EntityId>> {
        let hits = ctx.checker.check(
            ctx.tree,
            cmd,
            CheckOptions {
                extended_margin: ctx.config.extended_margin,
                ..CheckOptions::default()
            },
        )?;
        let own = ctx
            .tree
            .world_bounds_with(cmd.target, &cmd.end)?;
        for hit in hits {
            let tags = ctx.tree.get(hit)?.props.classifications();
            if !tags.iter().any(|t| wanted.iter().any(|w| w == t)) {
                continue;
            }
            let target_bounds = ctx.tree.world_bounds(hit)?;
            if own.footprint_overlap_fraction(&target_bounds) >= min_overlap {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    /// Re-parent onto `target` and seat the candidate on its top face
    fn seat_on(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        target: EntityId,
    ) -> Option<()> {
        let target_entity = ctx.tree.get(target).ok()?;
        let target_zone = ctx.tree.zone_transform(target).ok()?;
        if !target_zone.rotation.is_identity() {
            tracing::warn!(
                ?target,
                "stacking onto a rotated target is unsupported, skipping"
            );
            return None;
        }
        let target_top = target_entity.scaled_bounds().max.y;
        let scale = target_zone.scale;
        if scale.min_element() <= 0.0 {
            tracing::warn!(?target, "stack target has a degenerate scale, skipping");
            return None;
        }

        let own = ctx.tree.get(cmd.target).ok()?;
        let own_bottom = own.bounds.scaled(cmd.end.scale).min.y;

        // Candidate's zone position, carried into the target's frame.
        // Composition multiplies child positions by the parent scale, so
        // the local offset divides it back out.
        let parent_frame = ctx.tree.parent_zone_transform(cmd.target).ok()?;
        let zone_pos = parent_frame.apply(cmd.end.position);
        let mut local = (zone_pos - target_zone.position) / scale;
        local.y = (target_top + own_bottom.abs() - ctx.config.stack_epsilon) / scale.y;

        cmd.end.position = local;
        cmd.end_parent = Some(target);
        Some(())
    }
}
