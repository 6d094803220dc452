//! OpenAPI 3.0/3.1 normalizer
//!
//! Decodes a YAML or JSON API description into a generic tree and extracts the
//! canonical endpoint model from it:
//! - metadata, servers and security schemes
//! - path-level and operation-level parameters, merged by name
//! - request bodies and responses with `$ref` resolution
//! - deterministic operation ids for operations that do not declare one
//!
//! Non-fatal issues are collected as warnings and reset on every parse.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

use super::reference::RefResolver;
use super::{
    ApiEndpoint, ApiParameter, ApiResponse, ApiSpec, HttpMethod, ParameterLocation, ParameterType,
    ParseError, RequestBody, Server,
};

/// OpenAPI major.minor versions accepted by the parser
pub const SUPPORTED_VERSIONS: &[&str] = &["3.0", "3.1"];

static PATH_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]+\}").expect("placeholder pattern is valid"));
static REPEATED_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("underscore pattern is valid"));

/// Textual encoding of an API description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Json,
}

impl SpecFormat {
    /// Guess the format from the content itself
    pub fn detect(content: &str) -> Self {
        match content.trim_start().chars().next() {
            Some('{') | Some('[') => SpecFormat::Json,
            _ => SpecFormat::Yaml,
        }
    }

    /// Guess the format from a file name or URL, if its extension is conclusive
    pub fn from_extension(source: &str) -> Option<Self> {
        let lower = source.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Some(SpecFormat::Json)
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Some(SpecFormat::Yaml)
        } else {
            None
        }
    }
}

impl fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecFormat::Yaml => write!(f, "yaml"),
            SpecFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for SpecFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(SpecFormat::Yaml),
            "json" => Ok(SpecFormat::Json),
            other => Err(ParseError::UnknownFormat(other.to_string())),
        }
    }
}

/// Stateful parser; warnings describe the most recent [`OpenApiParser::parse`] call
#[derive(Debug, Default)]
pub struct OpenApiParser {
    warnings: Vec<String>,
}

impl OpenApiParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-fatal issues found during the last parse
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Parse an API description into the canonical model
    pub fn parse(&mut self, content: &str, format: SpecFormat) -> Result<ApiSpec, ParseError> {
        self.warnings.clear();

        let document = decode(content, format)?;
        if !document.is_object() {
            return Err(ParseError::NotAnObject);
        }
        validate_version(&document)?;

        let spec = self.build_spec(document);
        tracing::debug!(
            endpoints = spec.endpoints.len(),
            warnings = self.warnings.len(),
            "OpenAPI parser finished"
        );
        Ok(spec)
    }

    fn build_spec(&mut self, document: JsonValue) -> ApiSpec {
        let info = document.get("info");
        let info_str = |key: &str, default: &str| {
            info.and_then(|i| i.get(key))
                .and_then(scalar_text)
                .unwrap_or_else(|| default.to_string())
        };
        let title = info_str("title", "Untitled API");
        let version = info_str("version", "1.0.0");
        let description = info_str("description", "");

        let servers: Vec<Server> = document
            .get("servers")
            .and_then(JsonValue::as_array)
            .map(|arr| {
                arr.iter()
                    .filter(|s| s.is_object())
                    .map(|s| Server {
                        url: str_field(s, "url"),
                        description: str_field(s, "description"),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let base_url = servers.first().map(|s| s.url.clone()).unwrap_or_default();

        let security_schemes = document
            .pointer("/components/securitySchemes")
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default();

        let endpoints = self.parse_paths(&document);

        ApiSpec {
            title,
            version,
            description,
            base_url,
            endpoints,
            servers,
            security_schemes,
            source: document,
        }
    }

    fn parse_paths(&mut self, document: &JsonValue) -> Vec<ApiEndpoint> {
        let Some(paths) = document.get("paths").and_then(JsonValue::as_object) else {
            return Vec::new();
        };

        let mut endpoints = Vec::new();
        for (path, path_item) in paths {
            if !path_item.is_object() {
                continue;
            }

            let path_params = self.parse_parameters(document, path_item.get("parameters"));

            for method in HttpMethod::all() {
                let Some(operation) = path_item
                    .get(method.path_item_key())
                    .filter(|op| op.is_object())
                else {
                    continue;
                };

                // Decoding already kept one entry per path key, so pairs are unique
                endpoints.push(self.parse_operation(
                    document,
                    path,
                    *method,
                    operation,
                    &path_params,
                ));
            }
        }
        endpoints
    }

    fn parse_operation(
        &mut self,
        document: &JsonValue,
        path: &str,
        method: HttpMethod,
        operation: &JsonValue,
        path_params: &[ApiParameter],
    ) -> ApiEndpoint {
        // Operation-level parameters replace path-level ones with the same name
        let mut parameters = path_params.to_vec();
        for param in self.parse_parameters(document, operation.get("parameters")) {
            match parameters.iter_mut().find(|p| p.name == param.name) {
                Some(existing) => *existing = param,
                None => parameters.push(param),
            }
        }

        let request_body = operation
            .get("requestBody")
            .and_then(|body| self.parse_request_body(document, body));

        let responses = operation
            .get("responses")
            .and_then(JsonValue::as_object)
            .map(|responses| self.parse_responses(document, responses))
            .unwrap_or_default();

        let operation_id = match operation.get("operationId").and_then(JsonValue::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let generated = generate_operation_id(path, method);
                self.warnings.push(format!(
                    "Missing operationId for {method} {path}, generated: {generated}"
                ));
                generated
            }
        };

        let tags = operation
            .get("tags")
            .and_then(JsonValue::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(JsonValue::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        ApiEndpoint {
            path: path.to_string(),
            method,
            operation_id,
            summary: str_field(operation, "summary"),
            description: str_field(operation, "description"),
            tags,
            parameters,
            request_body,
            responses,
        }
    }

    fn parse_parameters(
        &mut self,
        document: &JsonValue,
        parameters: Option<&JsonValue>,
    ) -> Vec<ApiParameter> {
        let Some(parameters) = parameters.and_then(JsonValue::as_array) else {
            return Vec::new();
        };

        let mut resolver = RefResolver::new(document, &mut self.warnings);
        let mut parsed = Vec::with_capacity(parameters.len());
        for param in parameters {
            let Some(param) = resolver.resolve_shallow(param).filter(JsonValue::is_object) else {
                continue;
            };
            let schema = param
                .get("schema")
                .and_then(|schema| resolver.resolve_shallow(schema))
                .unwrap_or(JsonValue::Null);
            let location = param
                .get("in")
                .and_then(JsonValue::as_str)
                .map(ParameterLocation::from_openapi)
                .unwrap_or(ParameterLocation::Query);

            parsed.push(ApiParameter {
                name: str_field(&param, "name"),
                location,
                param_type: ParameterType::from_openapi(
                    schema.get("type").and_then(JsonValue::as_str),
                ),
                description: str_field(&param, "description"),
                required: param
                    .get("required")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false),
                default: schema.get("default").cloned(),
                example: param
                    .get("example")
                    .or_else(|| schema.get("example"))
                    .cloned(),
                enum_values: schema.get("enum").and_then(JsonValue::as_array).cloned(),
            });
        }
        parsed
    }

    fn parse_request_body(&mut self, document: &JsonValue, body: &JsonValue) -> Option<RequestBody> {
        let mut resolver = RefResolver::new(document, &mut self.warnings);
        let body = resolver.resolve_shallow(body)?;

        let mut content = Map::new();
        if let Some(media_types) = body.get("content").and_then(JsonValue::as_object) {
            for (media_type, media) in media_types {
                let schema = media
                    .get("schema")
                    .and_then(|schema| resolver.resolve_deep(schema))
                    .unwrap_or_else(|| JsonValue::Object(Map::new()));
                let example = media.get("example").cloned().unwrap_or(JsonValue::Null);
                content.insert(
                    media_type.clone(),
                    serde_json::json!({ "schema": schema, "example": example }),
                );
            }
        }

        Some(RequestBody {
            required: body
                .get("required")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            description: str_field(&body, "description"),
            content,
        })
    }

    fn parse_responses(
        &mut self,
        document: &JsonValue,
        responses: &Map<String, JsonValue>,
    ) -> Vec<ApiResponse> {
        let mut resolver = RefResolver::new(document, &mut self.warnings);
        responses
            .iter()
            .filter_map(|(status, response)| {
                let response = resolver.resolve_shallow(response)?;
                // Non-numeric keys such as `default` or `2XX` are treated as 200
                let status_code = status.parse::<u16>().unwrap_or(200);

                let json_content = response.pointer("/content/application~1json");
                let schema = json_content
                    .and_then(|media| media.get("schema"))
                    .and_then(|schema| resolver.resolve_deep(schema))
                    .unwrap_or(JsonValue::Null);
                let example = json_content
                    .and_then(|media| media.get("example"))
                    .cloned();

                Some(ApiResponse {
                    status_code,
                    description: str_field(&response, "description"),
                    schema,
                    example,
                })
            })
            .collect()
    }
}

/// Build an operation id from method and path, e.g. `GET /users/{id}` -> `get_users`
pub fn generate_operation_id(path: &str, method: HttpMethod) -> String {
    let without_placeholders = PATH_PLACEHOLDER.replace_all(path, "");
    let underscored = without_placeholders.replace('/', "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(underscored.trim_matches('_'), "_");
    let method = method.path_item_key();

    if collapsed.is_empty() {
        method.to_string()
    } else {
        format!("{method}_{collapsed}")
    }
}

fn decode(content: &str, format: SpecFormat) -> Result<JsonValue, ParseError> {
    match format {
        SpecFormat::Json => {
            serde_json::from_str(content).map_err(|e| ParseError::InvalidJson(e.to_string()))
        }
        SpecFormat::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
            .map(yaml_to_json)
            .map_err(|e| ParseError::InvalidYaml(e.to_string())),
    }
}

/// Convert a YAML tree to JSON, stringifying non-string mapping keys (`200:`)
fn yaml_to_json(value: serde_yaml::Value) -> JsonValue {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => JsonValue::Null,
        Yaml::Bool(b) => JsonValue::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
        Yaml::String(s) => JsonValue::String(s),
        Yaml::Sequence(items) => JsonValue::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => {
            let mut obj = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = match yaml_to_json(key) {
                    JsonValue::String(s) => s,
                    other => other.to_string(),
                };
                obj.insert(key, yaml_to_json(value));
            }
            JsonValue::Object(obj)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn validate_version(document: &JsonValue) -> Result<(), ParseError> {
    let version = document
        .get("openapi")
        .and_then(scalar_text)
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::MissingVersion)?;

    let major_minor = version.split('.').take(2).collect::<Vec<_>>().join(".");
    if SUPPORTED_VERSIONS.contains(&major_minor.as_str()) {
        Ok(())
    } else {
        Err(ParseError::UnsupportedVersion {
            version,
            supported: SUPPORTED_VERSIONS.join(", "),
        })
    }
}

/// Text of a string or number node (YAML may decode `3.0` or `1` unquoted)
fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field(value: &JsonValue, key: &str) -> String {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}
