//! Ordered rule evaluation with short-circuit on hard failure

use crate::autoplace::EntityBuilder;
use crate::command::{Command, CommandKind};
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::feedback::FeedbackSink;
use crate::rules::{
    AutoAddRule, BoundsFitRule, CascadeRule, CollisionRule, NotApprovedAction, OverhangRule, Rule,
    RuleClass, RuleOutcome, SizeLimitRule, SnapRule, StackingRule,
};
use crate::scene::SceneTree;

use super::context::{EvalContext, GestureState};

/// Where an evaluation ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalState {
    Pending,
    /// Every rule passed with the command untouched
    Approved,
    /// The command survived but at least one rule mutated its end state
    Corrected,
    /// An inviolable rule failed; terminal
    Rejected,
}

/// Aggregate result of one pipeline run
#[derive(Debug)]
pub struct PipelineResult {
    pub state: EvalState,
    pub approved: bool,
    pub corrected: bool,
    pub severity: crate::rules::Severity,
    pub action: NotApprovedAction,
    /// Side-effect commands to commit or discard atomically with the main
    /// command
    pub side_effects: Vec<Command>,
}

/// Runs rules in a fixed total order against each incoming command
pub struct RulePipeline {
    rules: Vec<Box<dyn Rule>>,
    config: EngineConfig,
}

impl RulePipeline {
    /// The standard rule order: geometry corrections first, then placement
    /// legality, then structural side effects
    pub fn new(config: EngineConfig) -> Self {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(SnapRule),
            Box::new(SizeLimitRule),
            Box::new(CascadeRule),
            Box::new(BoundsFitRule),
            Box::new(StackingRule),
            Box::new(CollisionRule),
            Box::new(OverhangRule),
            Box::new(AutoAddRule),
        ];
        Self { rules, config }
    }

    /// A pipeline with a caller-supplied rule list, in the given order
    pub fn with_rules(config: EngineConfig, rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one command through every applicable rule
    ///
    /// The command's end state may be corrected in place. On an inviolable
    /// failure the pipeline halts, applies the rule's not-approved action to
    /// the command, and reports `Rejected`.
    pub fn evaluate(
        &self,
        tree: &mut SceneTree,
        gesture: &mut GestureState,
        feedback: &dyn FeedbackSink,
        builder: &dyn EntityBuilder,
        cmd: &mut Command,
    ) -> PipelineResult {
        let mut ctx = EvalContext::new(tree, gesture, feedback, builder, &self.config);
        let mut aggregate = RuleOutcome::approved();
        let mut state = EvalState::Pending;

        for rule in &self.rules {
            if !rule.applies_to(cmd.kind) || cmd.ignored_rules.contains(&rule.id()) {
                continue;
            }
            let outcome = rule.evaluate(&mut ctx, cmd, &aggregate);
            let failed = !outcome.approved;
            let inviolable = rule.class() == RuleClass::Inviolable;
            tracing::debug!(
                rule = ?rule.id(),
                approved = outcome.approved,
                corrected = outcome.corrected,
                severity = ?outcome.severity,
                "rule evaluated"
            );
            aggregate.absorb(outcome);

            if failed && inviolable {
                state = EvalState::Rejected;
                if aggregate.action == NotApprovedAction::ResetToStart {
                    cmd.reset_to_start();
                }
                // Side effects gathered so far die with the rejection
                aggregate.side_effects.clear();
                break;
            }
        }

        // Stray surrogates here would leak into the next evaluation
        ctx.checker.clear_surrogates();

        if state == EvalState::Pending {
            state = if aggregate.corrected {
                EvalState::Corrected
            } else {
                EvalState::Approved
            };
        }

        PipelineResult {
            state,
            approved: state != EvalState::Rejected,
            corrected: aggregate.corrected,
            severity: aggregate.severity,
            action: aggregate.action,
            side_effects: aggregate.side_effects,
        }
    }

    /// Commit an approved command and its side effects to the tree
    ///
    /// The caller decides when to commit; discarding the command and result
    /// instead is the rollback path.
    pub fn commit(
        tree: &mut SceneTree,
        cmd: &Command,
        side_effects: Vec<Command>,
    ) -> Result<()> {
        Self::apply_one(tree, cmd)?;
        for effect in &side_effects {
            Self::apply_one(tree, effect)?;
        }
        Ok(())
    }

    fn apply_one(tree: &mut SceneTree, cmd: &Command) -> Result<()> {
        match cmd.kind {
            CommandKind::Add => {
                // Added entities are inserted by the builder during
                // evaluation; nothing left to apply.
                Ok(())
            }
            CommandKind::Move | CommandKind::Scale | CommandKind::Rotate => {
                // A rule (stacking) may have re-targeted the parent mid-run
                if let Some(new_parent) = cmd.end_parent {
                    if cmd.end_parent != cmd.start_parent {
                        tree.reparent(cmd.target, new_parent)?;
                    }
                }
                tree.get_mut(cmd.target)?.transform = cmd.end;
                Ok(())
            }
            CommandKind::Reparent => {
                if let Some(new_parent) = cmd.end_parent {
                    tree.reparent(cmd.target, new_parent)?;
                }
                tree.get_mut(cmd.target)?.transform = cmd.end;
                Ok(())
            }
            CommandKind::RemoveChild => {
                tree.remove_subtree(cmd.target)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoplace::NullBuilder;
    use crate::feedback::NullSink;
    use crate::geom::Aabb;
    use crate::rules::{RuleId, Severity};
    use crate::scene::{Entity, EntityKind, Transform};

    use glam::Vec3;

    struct FixedRule {
        id: RuleId,
        class: RuleClass,
        outcome: fn() -> RuleOutcome,
    }

    impl Rule for FixedRule {
        fn id(&self) -> RuleId {
            self.id
        }

        fn class(&self) -> RuleClass {
            self.class
        }

        fn applies_to(&self, _kind: CommandKind) -> bool {
            true
        }

        fn evaluate(
            &self,
            _ctx: &mut EvalContext<'_>,
            _cmd: &mut Command,
            _prior: &RuleOutcome,
        ) -> RuleOutcome {
            (self.outcome)()
        }
    }

    fn scene_with_product() -> (SceneTree, crate::core::types::EntityId) {
        let mut tree = SceneTree::new();
        let z = tree
            .insert(
                Entity::new(EntityKind::Zone)
                    .with_bounds(Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0))),
            )
            .unwrap();
        let mut e = Entity::new(EntityKind::Product).with_bounds(Aabb::centered(Vec3::ONE));
        e.parent = Some(z);
        let p = tree.insert(e).unwrap();
        (tree, p)
    }

    fn run(
        pipeline: &RulePipeline,
        tree: &mut SceneTree,
        cmd: &mut Command,
    ) -> PipelineResult {
        let mut gesture = GestureState::new();
        pipeline.evaluate(tree, &mut gesture, &NullSink, &NullBuilder, cmd)
    }

    #[test]
    fn test_all_pass_is_approved() {
        let (mut tree, p) = scene_with_product();
        let pipeline = RulePipeline::with_rules(
            EngineConfig::default(),
            vec![Box::new(FixedRule {
                id: RuleId::Snap,
                class: RuleClass::Standard,
                outcome: RuleOutcome::approved,
            })],
        );
        let mut cmd = Command::move_to(p, Transform::IDENTITY, Vec3::ONE);
        let result = run(&pipeline, &mut tree, &mut cmd);
        assert_eq!(result.state, EvalState::Approved);
        assert!(result.approved);
    }

    #[test]
    fn test_inviolable_failure_halts_and_resets() {
        let (mut tree, p) = scene_with_product();
        let ran_after: fn() -> RuleOutcome = || panic!("rule after rejection must not run");
        let pipeline = RulePipeline::with_rules(
            EngineConfig::default(),
            vec![
                Box::new(FixedRule {
                    id: RuleId::Collision,
                    class: RuleClass::Inviolable,
                    outcome: || RuleOutcome::rejected(NotApprovedAction::ResetToStart),
                }),
                Box::new(FixedRule {
                    id: RuleId::Overhang,
                    class: RuleClass::Standard,
                    outcome: ran_after,
                }),
            ],
        );
        let start = Transform::IDENTITY;
        let mut cmd = Command::move_to(p, start, Vec3::splat(5.0));
        let result = run(&pipeline, &mut tree, &mut cmd);
        assert_eq!(result.state, EvalState::Rejected);
        assert_eq!(cmd.end, start);
        assert!(result.side_effects.is_empty());
    }

    #[test]
    fn test_standard_failure_downgrades_only() {
        let (mut tree, p) = scene_with_product();
        let pipeline = RulePipeline::with_rules(
            EngineConfig::default(),
            vec![
                Box::new(FixedRule {
                    id: RuleId::Overhang,
                    class: RuleClass::Standard,
                    outcome: RuleOutcome::advisory,
                }),
                Box::new(FixedRule {
                    id: RuleId::Snap,
                    class: RuleClass::Standard,
                    outcome: RuleOutcome::corrected,
                }),
            ],
        );
        let mut cmd = Command::move_to(p, Transform::IDENTITY, Vec3::ONE);
        let result = run(&pipeline, &mut tree, &mut cmd);
        assert_eq!(result.state, EvalState::Corrected);
        assert_eq!(result.severity, Severity::Advisory);
    }

    #[test]
    fn test_ignored_rule_is_skipped() {
        let (mut tree, p) = scene_with_product();
        let boom: fn() -> RuleOutcome = || panic!("ignored rule must not run");
        let pipeline = RulePipeline::with_rules(
            EngineConfig::default(),
            vec![Box::new(FixedRule {
                id: RuleId::Stacking,
                class: RuleClass::Standard,
                outcome: boom,
            })],
        );
        let mut cmd =
            Command::move_to(p, Transform::IDENTITY, Vec3::ONE).ignoring(RuleId::Stacking);
        let result = run(&pipeline, &mut tree, &mut cmd);
        assert_eq!(result.state, EvalState::Approved);
    }

    #[test]
    fn test_commit_applies_move_and_side_effects() {
        let (mut tree, p) = scene_with_product();
        let (q, start_q) = {
            let mut e = Entity::new(EntityKind::Product).with_bounds(Aabb::centered(Vec3::ONE));
            e.parent = tree.get(p).unwrap().parent;
            let start = e.transform;
            (tree.insert(e).unwrap(), start)
        };
        let cmd = Command::move_to(p, Transform::IDENTITY, Vec3::new(3.0, 0.0, 0.0));
        let effect = Command::move_to(q, start_q, Vec3::new(-3.0, 0.0, 0.0));
        RulePipeline::commit(&mut tree, &cmd, vec![effect]).unwrap();
        assert_eq!(
            tree.get(p).unwrap().transform.position,
            Vec3::new(3.0, 0.0, 0.0)
        );
        assert_eq!(
            tree.get(q).unwrap().transform.position,
            Vec3::new(-3.0, 0.0, 0.0)
        );
    }
}
