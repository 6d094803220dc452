//! Canonical API model produced by the OpenAPI normalizer
//!
//! These types keep only the structure needed to drive invocation: endpoints,
//! their parameters with locations, request-body schemas and response schemas.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

/// Normalized API specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSpec {
    pub title: String,
    pub version: String,
    pub description: String,
    /// URL of the first declared server, or empty
    pub base_url: String,
    pub endpoints: Vec<ApiEndpoint>,
    pub servers: Vec<Server>,
    pub security_schemes: Map<String, JsonValue>,
    /// The decoded source document, kept for reference resolution and debugging
    pub source: JsonValue,
}

impl ApiSpec {
    /// Find an endpoint by exact (path, method) equality
    pub fn find_endpoint(&self, path: &str, method: HttpMethod) -> Option<&ApiEndpoint> {
        self.endpoints
            .iter()
            .find(|endpoint| endpoint.path == path && endpoint.method == method)
    }

    /// Find an endpoint by its operation id
    pub fn find_operation(&self, operation_id: &str) -> Option<&ApiEndpoint> {
        self.endpoints
            .iter()
            .find(|endpoint| endpoint.operation_id == operation_id)
    }
}

/// Server declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: String,
}

/// HTTP methods the normalizer and executor understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    #[serde(rename = "GET", alias = "get")]
    Get,
    #[serde(rename = "POST", alias = "post")]
    Post,
    #[serde(rename = "PUT", alias = "put")]
    Put,
    #[serde(rename = "PATCH", alias = "patch")]
    Patch,
    #[serde(rename = "DELETE", alias = "delete")]
    Delete,
}

impl HttpMethod {
    /// Methods looked up under each path item, in declaration order
    pub fn all() -> &'static [HttpMethod] {
        &[
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Key used for this method inside an OpenAPI path item
    pub fn path_item_key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    /// Whether requests with this method may carry a JSON body
    pub fn allows_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(format!("Unsupported HTTP method: {s}")),
        }
    }
}

/// A single operation of the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: String,
    pub summary: String,
    pub description: String,
    pub tags: Vec<String>,
    pub parameters: Vec<ApiParameter>,
    pub request_body: Option<RequestBody>,
    pub responses: Vec<ApiResponse>,
}

impl ApiEndpoint {
    /// Human-readable label, e.g. `GET /users/{id}`
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn parameter(&self, name: &str) -> Option<&ApiParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Whether `name` is declared on this endpoint at `location`
    pub fn declares(&self, name: &str, location: ParameterLocation) -> bool {
        self.parameters
            .iter()
            .any(|p| p.name == name && p.location == location)
    }

    /// Schema of the `application/json` request body, if declared
    pub fn json_body_schema(&self) -> Option<&JsonValue> {
        self.request_body.as_ref().and_then(RequestBody::json_schema)
    }
}

/// Where a parameter is carried in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ParameterLocation {
    /// Map an OpenAPI `in` value; anything unrecognized is treated as a query parameter
    pub fn from_openapi(value: &str) -> Self {
        match value {
            "path" => ParameterLocation::Path,
            "header" => ParameterLocation::Header,
            "body" => ParameterLocation::Body,
            _ => ParameterLocation::Query,
        }
    }
}

/// Closed set of parameter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    /// Map an OpenAPI schema `type`; unknown or absent types fall back to string
    pub fn from_openapi(value: Option<&str>) -> Self {
        match value {
            Some("integer") => ParameterType::Integer,
            Some("number") => ParameterType::Number,
            Some("boolean") => ParameterType::Boolean,
            Some("array") => ParameterType::Array,
            Some("object") => ParameterType::Object,
            _ => ParameterType::String,
        }
    }
}

/// Operation parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub param_type: ParameterType,
    pub description: String,
    pub required: bool,
    pub default: Option<JsonValue>,
    pub example: Option<JsonValue>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<JsonValue>>,
}

/// Request body with per-media-type schemas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    pub description: String,
    pub content: Map<String, JsonValue>,
}

impl RequestBody {
    pub fn json_schema(&self) -> Option<&JsonValue> {
        self.content
            .get("application/json")
            .and_then(|media| media.get("schema"))
            .filter(|schema| schema.is_object())
    }
}

/// Declared response for a status code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status_code: u16,
    pub description: String,
    /// JSON schema of the `application/json` content, `Null` when absent
    pub schema: JsonValue,
    pub example: Option<JsonValue>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
