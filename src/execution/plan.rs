//! Location-aware request construction
//!
//! A [`RequestPlan`] is the transport-independent description of one HTTP call:
//! the substituted path, query pairs, headers and optional JSON body. Building
//! it is pure so the placement rules can be tested without a network.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value as JsonValue};
use url::Url;

use super::{EntityMap, InvocationError};
use crate::infrastructure::openapi::{ApiEndpoint, ApiSpec, HttpMethod, ParameterLocation};
use crate::scenarios::{ApiMapping, ParameterMapping, apply_transform};

/// Everything except RFC 3986 unreserved characters, so `/ ? #` stay inside a segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub method: HttpMethod,
    /// Endpoint path with placeholders substituted where values were available
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<JsonValue>,
}

impl RequestPlan {
    pub fn build(
        spec: &ApiSpec,
        mapping: &ApiMapping,
        entities: &EntityMap,
    ) -> Result<Self, InvocationError> {
        let endpoint = spec.find_endpoint(&mapping.endpoint_path, mapping.method);
        if endpoint.is_none() {
            tracing::debug!(
                "No endpoint declared for {}, parameters default to the query string",
                mapping.label()
            );
        }

        let mut path = mapping.endpoint_path.clone();
        let mut mapping_in_path = vec![false; mapping.parameter_mappings.len()];
        for (index, param) in mapping.parameter_mappings.iter().enumerate() {
            let placeholder = format!("{{{}}}", param.api_parameter);
            if !path.contains(&placeholder) {
                continue;
            }
            if let Some(value) = mapped_value(param, entities)? {
                let segment = path_segment(&param.api_parameter, &value)?;
                path = path.replace(&placeholder, &segment);
                mapping_in_path[index] = true;
            }
        }

        let mut static_in_path = Vec::new();
        for (name, value) in &mapping.static_params {
            let placeholder = format!("{{{name}}}");
            if path.contains(&placeholder) {
                path = path.replace(&placeholder, &path_segment(name, value)?);
                static_in_path.push(name.as_str());
            }
        }

        let mut query = Vec::new();
        for (index, param) in mapping.parameter_mappings.iter().enumerate() {
            let is_query = match endpoint {
                Some(endpoint) => endpoint.declares(&param.api_parameter, ParameterLocation::Query),
                None => !mapping_in_path[index],
            };
            if !is_query {
                continue;
            }
            if let Some(value) = mapped_value(param, entities)? {
                set_query(&mut query, &param.api_parameter, &value);
            }
        }
        for (name, value) in &mapping.static_params {
            if static_in_path.contains(&name.as_str()) || param_text(value).contains('{') {
                continue;
            }
            if endpoint.is_some_and(|e| !e.declares(name, ParameterLocation::Query)) {
                continue;
            }
            set_query(&mut query, name, value);
        }

        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        if let Some(endpoint) = endpoint {
            for param in &mapping.parameter_mappings {
                if !endpoint.declares(&param.api_parameter, ParameterLocation::Header) {
                    continue;
                }
                if let Some(value) = mapped_value(param, entities)? {
                    set_header(&mut headers, &param.api_parameter, param_text(&value));
                }
            }
        }

        let body = match endpoint {
            Some(endpoint) if mapping.method.allows_body() => {
                build_body(endpoint, mapping, entities)?
            }
            _ => None,
        };

        Ok(Self {
            method: mapping.method,
            path,
            query,
            headers,
            body,
        })
    }

    /// Join the path onto `base_url`
    pub fn url(&self, base_url: &str) -> Result<Url, InvocationError> {
        let invalid = |reason: String| InvocationError::InvalidUrl {
            url: format!("{base_url}{}", self.path),
            reason,
        };
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| invalid(e.to_string()))?;
        base.join(self.path.trim_start_matches('/'))
            .map_err(|e| invalid(e.to_string()))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Add a header unless one with the same name is already planned
    pub fn add_header_if_absent(&mut self, name: &str, value: String) {
        if self.header(name).is_none() {
            self.headers.push((name.to_string(), value));
        }
    }
}

fn build_body(
    endpoint: &ApiEndpoint,
    mapping: &ApiMapping,
    entities: &EntityMap,
) -> Result<Option<JsonValue>, InvocationError> {
    let Some(properties) = endpoint
        .json_body_schema()
        .and_then(|schema| schema.get("properties"))
        .and_then(JsonValue::as_object)
    else {
        return Ok(None);
    };

    let mut body = Map::new();
    for param in &mapping.parameter_mappings {
        if !properties.contains_key(&param.api_parameter) {
            continue;
        }
        if let Some(value) = mapped_value(param, entities)? {
            body.insert(param.api_parameter.clone(), value);
        }
    }
    for (name, value) in &mapping.static_params {
        if properties.contains_key(name) {
            body.insert(name.clone(), value.clone());
        }
    }

    Ok((!body.is_empty()).then_some(JsonValue::Object(body)))
}

/// Entity value for `param` with its transform applied; `None` when absent or null
fn mapped_value(
    param: &ParameterMapping,
    entities: &EntityMap,
) -> Result<Option<JsonValue>, InvocationError> {
    match entities.get(&param.entity_name) {
        Some(value) if !value.is_null() => {
            Ok(Some(apply_transform(value, param.transform.as_deref())?))
        }
        _ => Ok(None),
    }
}

/// `value` percent-encoded as exactly one path segment
fn path_segment(name: &str, value: &JsonValue) -> Result<String, InvocationError> {
    let text = param_text(value);
    // URL parsers resolve `.`, `..` and their %2E forms as dot segments
    if text == "." || text == ".." {
        return Err(InvocationError::PathSegment {
            name: name.to_string(),
            value: text,
        });
    }
    Ok(utf8_percent_encode(&text, PATH_SEGMENT).to_string())
}

/// Text placed in a path, query string or header
pub fn param_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn set_query(query: &mut Vec<(String, String)>, name: &str, value: &JsonValue) {
    query.retain(|(key, _)| key != name);
    match value {
        JsonValue::Array(items) => {
            for item in items.iter().filter(|item| !item.is_null()) {
                query.push((name.to_string(), param_text(item)));
            }
        }
        other => query.push((name.to_string(), param_text(other))),
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value));
}
