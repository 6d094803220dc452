//! Scenario definition and transform errors

use thiserror::Error;

/// Rejected scenario definitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    #[error("Scenario name cannot be empty")]
    EmptyName,

    #[error("Scenario '{0}' declares a required entity with an empty name")]
    EmptyRequiredEntity(String),

    #[error("Mapping path must start with '/': {0}")]
    InvalidPath(String),

    #[error("Parameter mapping for {endpoint} has an empty {field}")]
    EmptyMappingField {
        endpoint: String,
        field: &'static str,
    },

    #[error("Invalid scenario definition: {0}")]
    Invalid(String),
}

/// Coercions that cannot be applied to an entity value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Cannot convert {value} to integer")]
    Integer { value: String },

    #[error("Cannot convert {value} to float")]
    Float { value: String },
}
