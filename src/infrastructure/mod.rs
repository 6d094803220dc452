//! Adapters: API description loading, HTTP execution and template rendering

pub mod http;
pub mod openapi;
pub mod templates;
