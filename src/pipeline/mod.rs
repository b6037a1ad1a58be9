//! Rule pipeline: ordered evaluation of constraints against one command
//!
//! One command runs start-to-finish through every applicable rule before
//! the next is accepted. The evaluation context bundles everything a rule
//! may touch: collision checker, gesture-scoped state, and the external
//! seams, all owned for the lifetime of one evaluation.

pub mod context;
pub mod sequencer;

pub use context::{EvalContext, GestureState};
pub use sequencer::{EvalState, PipelineResult, RulePipeline};
