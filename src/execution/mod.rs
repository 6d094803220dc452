//! Mapping and invocation engine
//!
//! Turns a scenario's mappings plus extracted entity values into concrete HTTP
//! calls. Each call's failure is isolated into its own [`ExecutionResult`].

pub mod errors;
pub mod plan;
pub mod traits;
pub mod types;

pub use errors::InvocationError;
pub use plan::RequestPlan;
pub use traits::ApiExecutor;
pub use types::{EntityMap, ExecutionResult, ExtractedEntity, entity_map, is_truthy};
