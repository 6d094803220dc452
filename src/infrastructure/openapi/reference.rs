//! Internal `$ref` resolution over the decoded document tree
//!
//! References are walked component by component from the document root. Only
//! local pointers (`#/...`) are supported. Unresolvable references are reported
//! through the caller's warning list and the referencing construct is dropped.

use serde_json::{Map, Value as JsonValue};

/// Maximum number of reference hops followed along any single branch
pub const MAX_REF_DEPTH: usize = 8;

/// Resolves local references against a document, collecting warnings
pub struct RefResolver<'a> {
    document: &'a JsonValue,
    warnings: &'a mut Vec<String>,
}

impl<'a> RefResolver<'a> {
    pub fn new(document: &'a JsonValue, warnings: &'a mut Vec<String>) -> Self {
        Self { document, warnings }
    }

    /// Resolve `value` when it is a `$ref` object, following chained references.
    /// Returns `None` when the reference cannot be resolved to an object.
    pub fn resolve_shallow(&mut self, value: &JsonValue) -> Option<JsonValue> {
        let mut current = value.clone();
        for _ in 0..=MAX_REF_DEPTH {
            let Some(reference) = ref_target(&current) else {
                return Some(current);
            };
            let reference = reference.to_string();
            current = self.lookup(&reference)?;
        }
        self.warn(format!("Reference chain too deep: {}", describe(value)));
        None
    }

    /// Resolve every `$ref` nested anywhere inside `value`.
    /// Unresolvable nodes are removed from their parent.
    pub fn resolve_deep(&mut self, value: &JsonValue) -> Option<JsonValue> {
        self.resolve_at_depth(value, 0)
    }

    fn resolve_at_depth(&mut self, value: &JsonValue, depth: usize) -> Option<JsonValue> {
        match value {
            JsonValue::Object(obj) => {
                if let Some(reference) = ref_target(value) {
                    if depth >= MAX_REF_DEPTH {
                        self.warn(format!("Reference depth limit exceeded at {reference}"));
                        return None;
                    }
                    let target = self.lookup(reference)?;
                    return self.resolve_at_depth(&target, depth + 1);
                }

                let mut resolved = Map::with_capacity(obj.len());
                for (key, child) in obj {
                    if let Some(child) = self.resolve_at_depth(child, depth) {
                        resolved.insert(key.clone(), child);
                    }
                }
                Some(JsonValue::Object(resolved))
            }
            JsonValue::Array(items) => Some(JsonValue::Array(
                items
                    .iter()
                    .filter_map(|item| self.resolve_at_depth(item, depth))
                    .collect(),
            )),
            _ => Some(value.clone()),
        }
    }

    /// Walk a single `#/a/b/c` pointer. The target must be an object.
    fn lookup(&mut self, reference: &str) -> Option<JsonValue> {
        let Some(pointer) = reference.strip_prefix("#/") else {
            self.warn(format!("External reference not supported: {reference}"));
            return None;
        };

        let mut current = self.document;
        for raw in pointer.split('/') {
            let part = raw.replace("~1", "/").replace("~0", "~");
            let next = match current {
                JsonValue::Object(obj) => obj.get(&part),
                JsonValue::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => {
                    self.warn(format!("Could not resolve reference: {reference}"));
                    return None;
                }
            }
        }

        if current.is_object() {
            Some(current.clone())
        } else {
            self.warn(format!("Could not resolve reference: {reference}"));
            None
        }
    }

    fn warn(&mut self, message: String) {
        if !self.warnings.contains(&message) {
            tracing::debug!("{message}");
            self.warnings.push(message);
        }
    }
}

fn ref_target(value: &JsonValue) -> Option<&str> {
    value.get("$ref").and_then(JsonValue::as_str)
}

fn describe(value: &JsonValue) -> String {
    ref_target(value).unwrap_or("<inline>").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> JsonValue {
        json!({
            "components": {
                "schemas": {
                    "Id": { "type": "integer" },
                    "Alias": { "$ref": "#/components/schemas/Id" },
                    "Pet": {
                        "type": "object",
                        "properties": {
                            "id": { "$ref": "#/components/schemas/Id" },
                            "owner": { "$ref": "#/components/schemas/Missing" }
                        }
                    },
                    "Node": {
                        "type": "object",
                        "properties": { "next": { "$ref": "#/components/schemas/Node" } }
                    },
                    "a/b": { "type": "string" }
                }
            }
        })
    }

    #[test]
    fn test_resolve_shallow_follows_chains() {
        let doc = document();
        let mut warnings = Vec::new();
        let mut resolver = RefResolver::new(&doc, &mut warnings);
        let resolved = resolver
            .resolve_shallow(&json!({ "$ref": "#/components/schemas/Alias" }))
            .unwrap();
        assert_eq!(resolved, json!({ "type": "integer" }));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_external_reference_is_dropped_with_warning() {
        let doc = document();
        let mut warnings = Vec::new();
        let mut resolver = RefResolver::new(&doc, &mut warnings);
        assert!(
            resolver
                .resolve_shallow(&json!({ "$ref": "other.yaml#/Pet" }))
                .is_none()
        );
        assert_eq!(warnings, vec!["External reference not supported: other.yaml#/Pet"]);
    }

    #[test]
    fn test_resolve_deep_drops_unresolved_children() {
        let doc = document();
        let mut warnings = Vec::new();
        let mut resolver = RefResolver::new(&doc, &mut warnings);
        let resolved = resolver
            .resolve_deep(&json!({ "$ref": "#/components/schemas/Pet" }))
            .unwrap();
        assert_eq!(resolved["properties"]["id"], json!({ "type": "integer" }));
        assert!(resolved["properties"].get("owner").is_none());
        assert_eq!(
            warnings,
            vec!["Could not resolve reference: #/components/schemas/Missing"]
        );
    }

    #[test]
    fn test_resolve_deep_caps_recursive_schemas() {
        let doc = document();
        let mut warnings = Vec::new();
        let mut resolver = RefResolver::new(&doc, &mut warnings);
        let resolved = resolver
            .resolve_deep(&json!({ "$ref": "#/components/schemas/Node" }))
            .unwrap();
        assert_eq!(resolved["type"], "object");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Reference depth limit exceeded"));
    }

    #[test]
    fn test_pointer_unescaping() {
        let doc = document();
        let mut warnings = Vec::new();
        let mut resolver = RefResolver::new(&doc, &mut warnings);
        let resolved = resolver
            .resolve_shallow(&json!({ "$ref": "#/components/schemas/a~1b" }))
            .unwrap();
        assert_eq!(resolved, json!({ "type": "string" }));
    }
}
