//! Geometric snapping: absolute tables, incremental steps, sticky indices
//!
//! Two strategies, selected by per-entity configuration. Both share sticky
//! behavior: once a drag settles on a snap index, the index holds until the
//! raw value crosses the midpoint toward the neighboring index plus a
//! hysteresis margin, so continuous drags do not jitter between indices.

use crate::command::{Command, CommandKind};
use crate::core::types::Axis;
use crate::pipeline::EvalContext;
use crate::scene::{AxisSnap, keys};

use super::{Rule, RuleClass, RuleId, RuleOutcome};

/// Closest entry in a sorted snap table, honoring the centering buffer
pub fn absolute_snap(values: &[f32], buffer: f32, raw: f32) -> f32 {
    if values.is_empty() {
        return raw;
    }
    let target = raw - buffer;
    let best = values
        .iter()
        .copied()
        .min_by(|a, b| (a - target).abs().total_cmp(&(b - target).abs()))
        .unwrap_or(target);
    best + buffer
}

fn excluded(index: i32, exclusions: &[(i32, i32)]) -> bool {
    exclusions.iter().any(|&(s, e)| index >= s && index <= e)
}

/// Move an excluded index to the nearest legal boundary
///
/// Ties between the two sides go to the side matching `travel`, the sign of
/// the drag direction; zero travel prefers the lower side.
pub fn resolve_exclusions(index: i32, exclusions: &[(i32, i32)], travel: i32) -> i32 {
    if !excluded(index, exclusions) {
        return index;
    }
    let mut low = index;
    while excluded(low, exclusions) {
        low -= 1;
    }
    let mut high = index;
    while excluded(high, exclusions) {
        high += 1;
    }
    let d_low = index - low;
    let d_high = high - index;
    if d_low < d_high {
        low
    } else if d_high < d_low {
        high
    } else if travel > 0 {
        high
    } else {
        low
    }
}

/// One incremental-snap evaluation
///
/// Returns the snapped coordinate and the index it settled on. `sticky` is
/// the index a previous evaluation of the same gesture settled on, if any.
pub fn incremental_snap(
    step: f32,
    buffer: f32,
    exclusions: &[(i32, i32)],
    raw: f32,
    sticky: Option<i32>,
    hysteresis: f32,
) -> (f32, i32) {
    let fractional = (raw - buffer) / step;
    let index = match sticky {
        Some(held) if (fractional - held as f32).abs() <= 0.5 + hysteresis => held,
        _ => fractional.round() as i32,
    };
    let travel = match sticky {
        Some(held) => (fractional - held as f32).signum() as i32,
        None => 0,
    };
    let index = resolve_exclusions(index, exclusions, travel);
    (buffer + index as f32 * step, index)
}

/// Snaps a command's end position per the entity's snap configuration
pub struct SnapRule;

impl Rule for SnapRule {
    fn id(&self) -> RuleId {
        RuleId::Snap
    }

    fn class(&self) -> RuleClass {
        RuleClass::Standard
    }

    fn applies_to(&self, kind: CommandKind) -> bool {
        matches!(kind, CommandKind::Move | CommandKind::Add | CommandKind::Reparent)
    }

    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        _prior: &RuleOutcome,
    ) -> RuleOutcome {
        let spec = match ctx.tree.get(cmd.target) {
            Ok(entity) => match entity.props.snap(keys::SNAP) {
                Some(spec) => spec.clone(),
                None => return RuleOutcome::approved(),
            },
            Err(_) => return RuleOutcome::approved(),
        };

        let mut corrected = false;
        for axis in Axis::ALL {
            let Some(axis_snap) = spec.axis(axis) else {
                continue;
            };
            let idx = axis.index();
            let raw = cmd.end.position[idx];
            let snapped = match axis_snap {
                AxisSnap::Absolute { values, buffer } => absolute_snap(values, *buffer, raw),
                AxisSnap::Incremental {
                    step,
                    buffer,
                    exclusions,
                } => {
                    if *step == 0.0 {
                        // Explicit zero increment: no displacement at all
                        cmd.start.position[idx]
                    } else {
                        let sticky = ctx.gesture.sticky_index(cmd.target, axis);
                        let (snapped, index) = incremental_snap(
                            *step,
                            *buffer,
                            exclusions,
                            raw,
                            sticky,
                            ctx.config.sticky_hysteresis,
                        );
                        if cmd.is_transient() {
                            ctx.gesture.set_sticky_index(cmd.target, axis, index);
                        }
                        snapped
                    }
                }
            };
            if (snapped - raw).abs() > ctx.config.geom_epsilon {
                cmd.end.position[idx] = snapped;
                corrected = true;
            }
        }

        if corrected {
            RuleOutcome::corrected()
        } else {
            RuleOutcome::approved()
        }
    }
}
