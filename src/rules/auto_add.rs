//! Auto-add regeneration on host move/scale
//!
//! Hosts carrying auto-add configuration get their support children
//! regenerated whenever geometry that affects them changes. Final commands
//! run the full placement strategies; transient commands only side-pocket
//! span interiors so a drag preview never churns the tree. Any placement
//! failure rejects the command without touching the scene (the strategies
//! roll their own work back).

use crate::autoplace::{distribute_span, place_by_collision, place_by_position, pocket_span_children};
use crate::command::{Command, CommandKind, CommandPhase};
use crate::core::types::EntityId;
use crate::pipeline::EvalContext;
use crate::scene::{AutoAddSpec, keys};

use super::{NotApprovedAction, Rule, RuleClass, RuleId, RuleOutcome};

pub struct AutoAddRule;

impl Rule for AutoAddRule {
    fn id(&self) -> RuleId {
        RuleId::AutoAdd
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
        let specs = match ctx.tree.get(cmd.target) {
            Ok(entity) if !entity.is_auto_added() => {
                entity.props.auto_add(keys::AUTO_ADD).cloned().unwrap_or_default()
            }
            _ => return RuleOutcome::approved(),
        };
        if specs.is_empty() {
            return RuleOutcome::approved();
        }

        match cmd.phase {
            CommandPhase::Transient => self.pocket_for_preview(ctx, cmd, &specs),
            CommandPhase::Final => self.regenerate(ctx, cmd, &specs),
        }
    }
}

impl AutoAddRule {
    /// Drag preview: pull span interiors into the gesture pocket once so
    /// the tree stays stable for the rest of the drag
    fn pocket_for_preview(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &Command,
        specs: &[AutoAddSpec],
    ) -> RuleOutcome {
        if ctx.gesture.has_pocketed(cmd.target) {
            return RuleOutcome::approved();
        }
        for spec in specs {
            if let AutoAddSpec::Span { tool, axis, .. } = spec {
                if let Err(err) =
                    pocket_span_children(ctx.tree, ctx.gesture, cmd.target, tool, *axis)
                {
                    tracing::warn!(target = ?cmd.target, tool, %err, "span pocketing failed");
                }
            }
        }
        RuleOutcome::approved()
    }

    /// Committed command: run every strategy against the candidate end
    /// geometry; one failure fails them all
    fn regenerate(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &Command,
        specs: &[AutoAddSpec],
    ) -> RuleOutcome {
        // The final pass supersedes anything pocketed during the drag
        ctx.gesture.take_pocketed(cmd.target);

        let mut created: Vec<EntityId> = Vec::new();
        for spec in specs {
            let placed = match spec {
                AutoAddSpec::Span { tool, axis, interval } => distribute_span(
                    ctx.tree,
                    ctx.builder,
                    cmd.target,
                    &cmd.end,
                    tool,
                    *axis,
                    *interval,
                ),
                AutoAddSpec::CollisionFit { tool, axis, step } => place_by_collision(
                    ctx.tree,
                    &mut ctx.checker,
                    ctx.builder,
                    ctx.config,
                    cmd.target,
                    &cmd.end,
                    tool,
                    *axis,
                    *step,
                ),
                AutoAddSpec::Position { tool, offsets } => {
                    place_by_position(ctx.tree, ctx.builder, cmd.target, offsets, tool)
                }
            };
            match placed {
                Ok(mut ids) => created.append(&mut ids),
                Err(err) => {
                    crate::autoplace::rollback_created(ctx.tree, &created);
                    ctx.feedback
                        .popup(&format!("Required {} could not be placed", spec.tool()));
                    tracing::debug!(target = ?cmd.target, tool = spec.tool(), %err, "auto-add pass failed");
                    return RuleOutcome::rejected(NotApprovedAction::NoReset);
                }
            }
        }
        RuleOutcome::approved()
    }
}
