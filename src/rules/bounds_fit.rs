//! Parent-bounds containment
//!
//! A child marked "must fit inside parent" has to keep its scaled bounds
//! within the parent's, with a configurable buffer per face. Transient
//! violations are advisory (status line only); a final command that
//! violates containment is rejected and reset.

use crate::command::{Command, CommandKind};
use crate::core::types::Axis;
use crate::pipeline::EvalContext;
use crate::scene::keys;

use super::{NotApprovedAction, Rule, RuleClass, RuleId, RuleOutcome};

pub struct BoundsFitRule;

impl Rule for BoundsFitRule {
    fn id(&self) -> RuleId {
        RuleId::BoundsFit
    }

    fn class(&self) -> RuleClass {
        RuleClass::Inviolable
    }

    fn applies_to(&self, kind: CommandKind) -> bool {
        matches!(
            kind,
            CommandKind::Move | CommandKind::Scale | CommandKind::Add | CommandKind::Reparent
        )
    }

    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        _prior: &RuleOutcome,
    ) -> RuleOutcome {
        let entity = match ctx.tree.get(cmd.target) {
            Ok(e) => e,
            Err(_) => return RuleOutcome::approved(),
        };
        if !entity.props.flag(keys::MUST_FIT_PARENT) {
            return RuleOutcome::approved();
        }
        let parent_id = match cmd.end_parent.or(entity.parent) {
            Some(p) => p,
            None => return RuleOutcome::approved(),
        };
        let parent = match ctx.tree.get(parent_id) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(target = ?cmd.target, %err, "containment parent missing, skipping");
                return RuleOutcome::approved();
            }
        };

        let child = entity.bounds.scaled(cmd.end.scale);
        let parent_bounds = parent.scaled_bounds();
        let buffer = ctx.config.containment_buffer;

        let mut fits = true;
        for axis in Axis::ALL {
            let idx = axis.index();
            let lo = child.min[idx] + cmd.end.position[idx];
            let hi = child.max[idx] + cmd.end.position[idx];
            if lo < parent_bounds.min[idx] + buffer - ctx.config.geom_epsilon
                || hi > parent_bounds.max[idx] - buffer + ctx.config.geom_epsilon
            {
                fits = false;
                break;
            }
        }
        if fits {
            return RuleOutcome::approved();
        }

        if cmd.is_transient() {
            ctx.feedback.status("Item does not fit inside its parent");
            RuleOutcome::advisory()
        } else {
            ctx.feedback.popup("Item does not fit inside its parent");
            RuleOutcome::rejected(NotApprovedAction::ResetToStart)
        }
    }
}
