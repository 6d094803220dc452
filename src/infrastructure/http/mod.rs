//! HTTP adapters for the invocation engine

pub mod auth;
pub mod executor;
pub mod mock;

pub use auth::{AuthConfig, AuthError, KeyLocation, Secret};
pub use executor::HttpApiExecutor;
pub use mock::MockApiExecutor;
