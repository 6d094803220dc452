//! api-agent library
//!
//! Builds Q&A agents that answer natural-language questions by calling an HTTP
//! API described with OpenAPI. The pipeline normalizes the API description,
//! turns a declarative scenario plus extracted entities into concrete HTTP
//! calls, and renders the results through Tera templates with layered
//! fallbacks.
#![deny(unsafe_code)]

pub mod application;
pub mod core;
pub mod execution;
pub mod infrastructure;
pub mod scenarios;

pub use application::{AgentResponse, AppContext, QaAgent};
pub use crate::core::{Error, Result, Settings};
pub use execution::{ApiExecutor, ExecutionResult};
pub use infrastructure::openapi::{ApiSpec, OpenApiParser, ParseError, SpecFormat};
pub use infrastructure::templates::TemplateRenderer;
pub use scenarios::Scenario;
