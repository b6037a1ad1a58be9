//! Collision legality
//!
//! Rejects a command that introduces a new illegal contact. Only contacts
//! that are illegal at the end geometry and were absent or legal at the
//! start geometry count: pre-existing contact is never re-litigated, so an
//! entity already touching something illegal can still be dragged away.
//! Final commands additionally fail when a declared minimum contact count
//! (Exact / AtLeast) is not reached at the end geometry.

use crate::collision::CheckOptions;
use crate::command::{Command, CommandKind};
use crate::pipeline::EvalContext;
use crate::scene::{CountModifier, keys};

use super::{NotApprovedAction, Rule, RuleClass, RuleId, RuleOutcome};

pub struct CollisionRule;

impl Rule for CollisionRule {
    fn id(&self) -> RuleId {
        RuleId::Collision
    }

    fn class(&self) -> RuleClass {
        RuleClass::Inviolable
    }

    fn applies_to(&self, kind: CommandKind) -> bool {
        // Removal cannot collide; everything else can
        !matches!(kind, CommandKind::RemoveChild)
    }

    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        _prior: &RuleOutcome,
    ) -> RuleOutcome {
        let newly_illegal = match ctx.checker.newly_illegal(ctx.tree, cmd) {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(target = ?cmd.target, %err, "collision query failed, skipping rule");
                return RuleOutcome::approved();
            }
        };

        // Auto-added entities get regenerated around the command; contact
        // with them is the auto-placement pass's problem.
        let blocking: Vec<_> = newly_illegal
            .into_iter()
            .filter(|&id| {
                ctx.tree
                    .get(id)
                    .map(|e| !e.is_auto_added())
                    .unwrap_or(false)
            })
            .collect();

        if blocking.is_empty() {
            if cmd.is_final() {
                if let Some(outcome) = self.unmet_minimums(ctx, cmd) {
                    return outcome;
                }
            }
            return RuleOutcome::approved();
        }

        tracing::debug!(
            target = ?cmd.target,
            count = blocking.len(),
            "newly illegal collision"
        );
        if cmd.is_transient() {
            ctx.feedback.status("Placement collides with another item");
        } else {
            ctx.feedback.popup("Placement collides with another item");
        }
        RuleOutcome::rejected(NotApprovedAction::ResetToStart)
    }
}

impl CollisionRule {
    /// Reject a final placement whose declared minimum contact counts are
    /// not reached. Contacts are gathered with the near-contact margin so
    /// resting contact (touching faces) counts, and with the target's own
    /// children included since auto-added supports satisfy minimums.
    fn unmet_minimums(&self, ctx: &mut EvalContext<'_>, cmd: &Command) -> Option<RuleOutcome> {
        let declared = ctx
            .tree
            .get(cmd.target)
            .ok()?
            .props
            .relationships(keys::RELATIONSHIPS)?;
        if !declared
            .iter()
            .any(|r| matches!(r.modifier, CountModifier::Exact | CountModifier::AtLeast))
        {
            return None;
        }
        let contacts = ctx.checker.check(
            ctx.tree,
            cmd,
            CheckOptions {
                include_children: true,
                extended_margin: ctx.config.extended_margin,
                ..CheckOptions::default()
            },
        );
        let result = contacts.and_then(|hits| crate::collision::analyze(ctx.tree, cmd.target, &hits));
        let result = match result {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(target = ?cmd.target, %err, "contact query failed, skipping minimum check");
                return None;
            }
        };
        if result.unmet.is_empty() {
            return None;
        }
        tracing::debug!(
            target = ?cmd.target,
            unmet = result.unmet.len(),
            "required contacts missing"
        );
        ctx.feedback.popup("Item is missing a required contact");
        Some(RuleOutcome::rejected(NotApprovedAction::ResetToStart))
    }
}
