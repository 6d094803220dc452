//! Tera-based answer renderer with layered fallbacks

use serde_json::{Map, Value as JsonValue, json};
use std::collections::BTreeSet;
use tera::{Context, Template, Tera};

use super::syntax::{free_variables, normalize_filter_args};
use super::{RenderError, filters};
use crate::execution::ExecutionResult;

const TEMPLATE_NAME: &str = "__answer";

/// Renders answer templates. Cheap to clone; every render works on its own
/// copy of the filter-configured engine.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    base: Tera,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        // Answers are plain text
        tera.autoescape_on(Vec::new());
        filters::register(&mut tera);
        Self { base: tera }
    }

    /// Render `template` against `data`, or fail with a classified error
    pub fn try_render(
        &self,
        template: &str,
        data: &Map<String, JsonValue>,
    ) -> Result<String, RenderError> {
        let source = normalize_filter_args(template);
        let mut tera = self.base.clone();
        tera.add_raw_template(TEMPLATE_NAME, &source)
            .map_err(|e| RenderError::from_parse(&e))?;

        let context =
            Context::from_serialize(data).map_err(|e| RenderError::Other(e.to_string()))?;
        tera.render(TEMPLATE_NAME, &context)
            .map_err(|e| RenderError::from_render(&e))
    }

    /// Render `template`, never failing.
    ///
    /// On error the error template is rendered once with `error` bound to the
    /// failure description. If that also fails, or no error template is given,
    /// the failure description itself is returned.
    pub fn render(
        &self,
        template: &str,
        data: &Map<String, JsonValue>,
        error_template: Option<&str>,
    ) -> String {
        let error = match self.try_render(template, data) {
            Ok(rendered) => return rendered,
            Err(error) => error,
        };
        tracing::warn!(error = %error, "Template render failed, using fallback");

        let Some(error_template) = error_template.filter(|t| !t.is_empty()) else {
            return error.fallback_text();
        };

        let mut context = Map::new();
        context.insert("error".to_string(), JsonValue::String(error.to_string()));
        self.try_render(error_template, &context)
            .unwrap_or_else(|fallback_error| {
                tracing::warn!(error = %fallback_error, "Error template failed to render");
                error.to_string()
            })
    }

    /// Compose an answer from the results of a scenario's calls
    pub fn render_invocation_results(
        &self,
        template: &str,
        results: &[ExecutionResult],
        error_template: &str,
        no_data_template: &str,
    ) -> String {
        if !results.is_empty() && results.iter().all(|r| !r.success) {
            let messages: Vec<&str> = results
                .iter()
                .map(|r| r.error.as_deref().unwrap_or("Unknown error"))
                .collect();
            let mut context = Map::new();
            context.insert("error".to_string(), json!(messages.join("; ")));
            return self.render(error_template, &context, None);
        }

        let mut context = Map::new();
        let first_with_data = results
            .iter()
            .find(|r| r.has_data());
        if let Some(first) = first_with_data {
            if let Some(fields) = first.data.as_object() {
                context.extend(fields.clone());
            }
            context.insert("data".to_string(), first.data.clone());
        }
        for (index, result) in results.iter().enumerate() {
            let body = if result.success {
                result.data.clone()
            } else {
                JsonValue::Null
            };
            context.insert(format!("result_{index}"), body);
        }

        let success_count = results.iter().filter(|r| r.success).count();
        context.insert("_results".to_string(), json!(results));
        context.insert("_success_count".to_string(), json!(success_count));
        context.insert(
            "_error_count".to_string(),
            json!(results.len() - success_count),
        );

        if first_with_data.is_none() {
            return self.render(no_data_template, &context, None);
        }
        self.render(template, &context, Some(error_template))
    }

    /// Parse without rendering
    pub fn validate_template(&self, template: &str) -> (bool, Option<String>) {
        match self.parse(template) {
            Ok(()) => (true, None),
            Err(error) => (false, Some(error.validation_message())),
        }
    }

    /// Free variables of a valid template; empty for invalid ones
    pub fn extract_variables(&self, template: &str) -> BTreeSet<String> {
        match Template::new(TEMPLATE_NAME, None, &normalize_filter_args(template)) {
            Ok(parsed) => free_variables(&parsed.ast),
            Err(_) => BTreeSet::new(),
        }
    }

    fn parse(&self, template: &str) -> Result<(), RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, &normalize_filter_args(template))
            .map_err(|e| RenderError::from_parse(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::InvocationError;

    fn data(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    fn ok(endpoint: &str, body: JsonValue) -> ExecutionResult {
        ExecutionResult::succeeded(endpoint, body)
    }

    fn failed(endpoint: &str, message: &str) -> ExecutionResult {
        ExecutionResult::failed(endpoint, &InvocationError::Simulated(message.to_string()))
    }

    #[test]
    fn test_render_with_positional_filter_arguments() {
        let renderer = TemplateRenderer::new();
        let rendered = renderer.render(
            "{{ name }}: {{ price | format_currency('USD') }}",
            &data(json!({ "name": "Laptop", "price": 100 })),
            None,
        );
        assert_eq!(rendered, "Laptop: $100");
    }

    #[test]
    fn test_output_is_not_html_escaped() {
        let renderer = TemplateRenderer::new();
        let rendered = renderer.render("{{ q }}", &data(json!({ "q": "Tom & Jerry <3" })), None);
        assert_eq!(rendered, "Tom & Jerry <3");
    }

    #[test]
    fn test_missing_variable_uses_error_template() {
        let renderer = TemplateRenderer::new();
        let rendered = renderer.render(
            "Hello {{ name }}",
            &Map::new(),
            Some("Oops: {{ error }}"),
        );
        assert!(rendered.starts_with("Oops: Missing data: "));
        assert!(rendered.contains("name"));

        let plain = renderer.render("Hello {{ name }}", &Map::new(), None);
        assert!(plain.starts_with("Missing data: "));
    }

    #[test]
    fn test_syntax_error_fallbacks() {
        let renderer = TemplateRenderer::new();
        let with_template = renderer.render("{% if %}", &Map::new(), Some("E: {{ error }}"));
        assert!(with_template.starts_with("E: Template syntax error: "));

        let without = renderer.render("{% if %}", &Map::new(), None);
        assert!(without.starts_with("Template error: "));
    }

    #[test]
    fn test_broken_error_template_is_bounded() {
        let renderer = TemplateRenderer::new();
        let rendered = renderer.render("{{ missing }}", &Map::new(), Some("{{ also_missing }}"));
        assert!(rendered.starts_with("Missing data: "));
        assert!(rendered.contains("missing"));
    }

    #[test]
    fn test_all_failed_renders_joined_errors() {
        let renderer = TemplateRenderer::new();
        let results = vec![failed("GET /a", "boom"), failed("GET /b", "timeout")];
        let rendered = renderer.render_invocation_results(
            "{{ never }}",
            &results,
            "Error: {{ error }}",
            "nothing",
        );
        assert_eq!(rendered, "Error: boom; timeout");
    }

    #[test]
    fn test_partial_success_context() {
        let renderer = TemplateRenderer::new();
        let results = vec![
            failed("GET /a", "404"),
            ok("GET /b", json!({ "name": "Lamp", "stock": 3 })),
        ];
        let rendered = renderer.render_invocation_results(
            "{{ name }} ({{ stock }}) {{ data.name }} {{ result_1.stock }} \
             {% if result_0 %}x{% else %}none{% endif %} {{ _success_count }}/{{ _error_count }} {{ _results | length }}",
            &results,
            "err",
            "nothing",
        );
        assert_eq!(rendered, "Lamp (3) Lamp 3 none 1/1 2");
    }

    #[test]
    fn test_no_data_template_when_bodies_are_empty() {
        let renderer = TemplateRenderer::new();
        let results = vec![ok("GET /a", json!([])), ok("GET /b", json!({}))];
        let rendered = renderer.render_invocation_results(
            "{{ data }}",
            &results,
            "err",
            "No matching data found.",
        );
        assert_eq!(rendered, "No matching data found.");

        let empty = renderer.render_invocation_results("{{ data }}", &[], "err", "none");
        assert_eq!(empty, "none");
    }

    #[test]
    fn test_main_template_failure_falls_back_to_error_template() {
        let renderer = TemplateRenderer::new();
        let results = vec![ok("GET /a", json!({ "name": "Lamp" }))];
        let rendered = renderer.render_invocation_results(
            "{{ price }}",
            &results,
            "Sorry: {{ error }}",
            "nothing",
        );
        assert!(rendered.starts_with("Sorry: Missing data: "));
    }

    #[test]
    fn test_non_object_body_is_bound_as_data() {
        let renderer = TemplateRenderer::new();
        let results = vec![ok("GET /names", json!(["a", "b"]))];
        let rendered = renderer.render_invocation_results(
            "{% for n in data %}{{ n }}{% endfor %}",
            &results,
            "err",
            "nothing",
        );
        assert_eq!(rendered, "ab");
    }

    #[test]
    fn test_validate_template() {
        let renderer = TemplateRenderer::new();
        assert_eq!(renderer.validate_template("Hi {{ name }}"), (true, None));

        let (valid, message) = renderer.validate_template("line 1\n{% for x in items %}{{ x }}");
        assert!(!valid);
        assert!(message.unwrap().starts_with("Syntax error at line 2: "));
    }

    #[test]
    fn test_extract_variables() {
        let renderer = TemplateRenderer::new();
        let vars = renderer.extract_variables(
            "{% for p in products %}{{ p.name | truncate_text(20) }}{% endfor %}{{ total | format_number(0) }}",
        );
        assert_eq!(
            vars.into_iter().collect::<Vec<_>>(),
            vec!["products".to_string(), "total".to_string()]
        );
        assert!(renderer.extract_variables("{% if %}").is_empty());
    }
}
