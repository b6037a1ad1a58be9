//! Planfix - Constraint Evaluation for Hierarchical Scene Layout

pub mod autoplace;
pub mod collision;
pub mod command;
pub mod core;
pub mod feedback;
pub mod geom;
pub mod pipeline;
pub mod rules;
pub mod scene;

pub use crate::core::error::{PlanError, Result};
