//! Composable placement constraints
//!
//! Each rule is one constraint unit: it inspects a candidate command, may
//! correct the command's end state in place, may enqueue side-effect
//! commands, and reports whether the command survives. Rules never error
//! across the pipeline boundary; internal failures degrade to a logged
//! skip or a rejection outcome.

pub mod auto_add;
pub mod bounds_fit;
pub mod cascade;
pub mod collision_rule;
pub mod overhang;
pub mod size_limit;
pub mod snap;
pub mod stacking;

pub use auto_add::AutoAddRule;
pub use bounds_fit::BoundsFitRule;
pub use cascade::CascadeRule;
pub use collision_rule::CollisionRule;
pub use overhang::OverhangRule;
pub use size_limit::SizeLimitRule;
pub use snap::SnapRule;
pub use stacking::StackingRule;

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandKind};
use crate::pipeline::EvalContext;

/// Stable identity of a rule, used in per-command ignore sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleId {
    Snap,
    SizeLimit,
    Cascade,
    BoundsFit,
    Stacking,
    Collision,
    Overhang,
    AutoAdd,
}

/// Hard-blocking vs. advisory constraint classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleClass {
    /// A failure aborts the pipeline and resets or clears the command
    Inviolable,
    /// A failure may only downgrade severity or leave a correction in place
    Standard,
}

/// How bad a violation is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    None,
    Advisory,
    Severe,
}

/// What the caller should do with a command that was not approved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotApprovedAction {
    /// Reset the command's end state to its start state
    ResetToStart,
    /// Discard this command only
    ClearCurrent,
    /// Discard the whole in-flight command batch
    ClearAll,
    /// Leave the command as-is; the scene was never touched
    NoReset,
}

/// Outcome of one rule evaluation
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub approved: bool,
    /// The command's end state was mutated by this rule
    pub corrected: bool,
    pub severity: Severity,
    pub action: NotApprovedAction,
    /// Extra commands to batch-apply with the main command
    pub side_effects: Vec<Command>,
}

impl RuleOutcome {
    pub fn approved() -> Self {
        Self {
            approved: true,
            corrected: false,
            severity: Severity::None,
            action: NotApprovedAction::NoReset,
            side_effects: Vec::new(),
        }
    }

    pub fn corrected() -> Self {
        Self {
            corrected: true,
            ..Self::approved()
        }
    }

    pub fn advisory() -> Self {
        Self {
            severity: Severity::Advisory,
            ..Self::approved()
        }
    }

    pub fn rejected(action: NotApprovedAction) -> Self {
        Self {
            approved: false,
            corrected: false,
            severity: Severity::Severe,
            action,
            side_effects: Vec::new(),
        }
    }

    pub fn with_side_effects(mut self, commands: Vec<Command>) -> Self {
        self.side_effects = commands;
        self
    }

    /// Merge a later rule's outcome into the running aggregate
    pub fn absorb(&mut self, other: RuleOutcome) {
        self.approved &= other.approved;
        self.corrected |= other.corrected;
        self.severity = self.severity.max(other.severity);
        if !other.approved {
            self.action = other.action;
        }
        self.side_effects.extend(other.side_effects);
    }
}

/// One constraint unit in the pipeline
pub trait Rule {
    fn id(&self) -> RuleId;

    fn class(&self) -> RuleClass;

    /// Whether this rule has anything to say about the given command kind
    fn applies_to(&self, kind: CommandKind) -> bool;

    /// Evaluate the (possibly already-corrected) command. `prior` is the
    /// aggregate outcome of the rules that ran before this one.
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        prior: &RuleOutcome,
    ) -> RuleOutcome;
}
