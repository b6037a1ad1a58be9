//! Collision detection and legality classification

pub mod checker;
pub mod legality;

pub use checker::{CheckOptions, CollisionChecker};
pub use legality::{CollisionResult, analyze};
