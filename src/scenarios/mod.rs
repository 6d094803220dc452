//! Scenario model, validation and parameter transforms

pub mod errors;
pub mod transform;
pub mod types;

pub use errors::{ScenarioError, TransformError};
pub use transform::{Transform, apply_transform};
pub use types::*;
