//! Application layer - answers questions by coordinating matching, execution and rendering

pub mod agent;
pub mod context;
pub mod errors;
pub mod matcher;
pub mod types;

pub use agent::QaAgent;
pub use context::AppContext;
pub use errors::{DefinitionError, MatchError};
pub use matcher::{PresetMatcher, ScenarioMatcher};
pub use types::*;
