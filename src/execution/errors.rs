//! Errors raised by a single API invocation

use thiserror::Error;

use crate::scenarios::TransformError;

/// Failure of one mapping's call. Always isolated into that mapping's
/// [`ExecutionResult`](super::ExecutionResult).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    #[error("API returned error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timeout after {0}s")]
    Timeout(u64),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Path parameter {name} cannot be the segment '{value}'")]
    PathSegment { name: String, value: String },

    #[error("Invalid parameter value: {0}")]
    Transform(#[from] TransformError),

    /// Failure configured on an offline executor
    #[error("{0}")]
    Simulated(String),
}
