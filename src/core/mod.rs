//! Cross-cutting concerns: configuration and the crate-level error type

pub mod config;
pub mod error;

pub use config::{HttpSettings, MatchingSettings, Messages, Settings};
pub use error::{Error, Result};
