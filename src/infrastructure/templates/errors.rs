//! Template rendering errors

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error as _;
use thiserror::Error;

static LINE_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-->\s*(\d+):(\d+)").expect("line/column pattern is valid"));

/// Why a template could not be rendered. Never surfaced to end users as a
/// failure; the renderer converts it into fallback text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Template syntax error: {message}")]
    Syntax { line: Option<usize>, message: String },

    #[error("Missing data: {0}")]
    MissingVariable(String),

    #[error("{0}")]
    Other(String),
}

impl RenderError {
    /// Classify a Tera parse failure
    pub fn from_parse(error: &tera::Error) -> Self {
        let detail = innermost_message(error);
        let line = LINE_COLUMN
            .captures(&detail)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
        // Pest reports the expectation on a line starting with `=`
        let message = detail
            .lines()
            .rev()
            .map(str::trim)
            .find_map(|l| l.strip_prefix("= "))
            .map(str::to_string)
            .unwrap_or_else(|| detail.trim().to_string());

        RenderError::Syntax { line, message }
    }

    /// Classify a Tera render failure
    pub fn from_render(error: &tera::Error) -> Self {
        let detail = innermost_message(error);
        if detail.contains("not found in context") {
            let message = detail
                .split(" while rendering")
                .next()
                .unwrap_or(&detail)
                .to_string();
            RenderError::MissingVariable(message)
        } else {
            RenderError::Other(detail)
        }
    }

    /// Text returned when no error template is available
    pub fn fallback_text(&self) -> String {
        match self {
            RenderError::Syntax { message, .. } => format!("Template error: {message}"),
            RenderError::MissingVariable(message) => format!("Missing data: {message}"),
            RenderError::Other(message) => format!("Render error: {message}"),
        }
    }

    /// Message in the `Syntax error at line N: ...` form used by validation
    pub fn validation_message(&self) -> String {
        match self {
            RenderError::Syntax {
                line: Some(line),
                message,
            } => format!("Syntax error at line {line}: {message}"),
            RenderError::Syntax { line: None, message } => format!("Syntax error: {message}"),
            other => other.to_string(),
        }
    }
}

fn innermost_message(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message = inner.to_string();
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let mut tera = tera::Tera::default();
        let err = tera
            .add_raw_template("t", "line one\n{% if x %}never closed")
            .unwrap_err();
        match RenderError::from_parse(&err) {
            RenderError::Syntax { line, message } => {
                assert_eq!(line, Some(2));
                assert!(!message.is_empty());
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_variable_classification() {
        let mut tera = tera::Tera::default();
        tera.add_raw_template("t", "{{ name }}").unwrap();
        let err = tera.render("t", &tera::Context::new()).unwrap_err();
        let classified = RenderError::from_render(&err);
        assert!(matches!(classified, RenderError::MissingVariable(ref m) if m.contains("name")));
        assert!(classified.to_string().starts_with("Missing data: "));
    }

    #[test]
    fn test_fallback_texts() {
        let syntax = RenderError::Syntax {
            line: Some(3),
            message: "unexpected end".to_string(),
        };
        assert_eq!(syntax.to_string(), "Template syntax error: unexpected end");
        assert_eq!(syntax.fallback_text(), "Template error: unexpected end");
        assert_eq!(
            syntax.validation_message(),
            "Syntax error at line 3: unexpected end"
        );
        assert_eq!(
            RenderError::Other("boom".to_string()).fallback_text(),
            "Render error: boom"
        );
    }
}
