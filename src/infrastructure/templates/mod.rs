//! Answer template rendering

pub mod errors;
pub mod filters;
pub mod renderer;
pub mod syntax;

pub use errors::RenderError;
pub use renderer::TemplateRenderer;
