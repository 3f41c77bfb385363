//! Lightweight JSON Schema validation.
//!
//! Supports the keyword subset the plugin schemas use: `type`, `required`,
//! `properties`, `additionalProperties`, `items`, `enum`, `const`,
//! `pattern`, `minLength`, `maxLength`, `minimum`, `maximum`, `minItems` and
//! `maxItems`. Other keywords (`$schema`, `title`, ...) are ignored.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use serde_json::{Map, Value};

/// A schema with its `pattern` regexes compiled.
#[derive(Debug, Clone)]
pub struct Schema {
    root: Value,
    patterns: HashMap<String, Regex>,
}

/// First violation found, with a JSON-pointer-style location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl Schema {
    /// Compile a schema document.
    ///
    /// Fails if the document is not an object, carries an invalid regex or
    /// uses a keyword outside the supported set.
    pub fn compile(root: Value) -> Result<Self, String> {
        if !root.is_object() {
            return Err("schema must be a JSON object".to_string());
        }
        let mut patterns = HashMap::new();
        compile_node(&root, "", &mut patterns)?;
        Ok(Self { root, patterns })
    }

    /// Parse and compile a schema from JSON text.
    pub fn parse(text: &str) -> Result<Self, String> {
        let root = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Self::compile(root)
    }

    /// Validate an instance, stopping at the first violation.
    pub fn validate(&self, instance: &Value) -> Result<(), SchemaViolation> {
        self.check(&self.root, instance, "")
    }

    fn check(&self, schema: &Value, instance: &Value, path: &str) -> Result<(), SchemaViolation> {
        let Some(schema) = schema.as_object() else {
            // `true`/`false` schemas.
            return match schema {
                Value::Bool(false) => Err(violation(path, "no value is allowed here")),
                _ => Ok(()),
            };
        };

        if let Some(expected) = schema.get("type") {
            check_type(expected, instance, path)?;
        }

        if let Some(Value::Array(options)) = schema.get("enum") {
            if !options.contains(instance) {
                return Err(violation(path, format!("must be one of {}", list(options))));
            }
        }

        if let Some(expected) = schema.get("const") {
            if expected != instance {
                return Err(violation(path, format!("must equal {expected}")));
            }
        }

        match instance {
            Value::String(s) => self.check_string(schema, s, path)?,
            Value::Number(n) => check_number(schema, n.as_f64().unwrap_or(f64::NAN), path)?,
            Value::Array(items) => self.check_array(schema, items, path)?,
            Value::Object(fields) => self.check_object(schema, fields, path)?,
            Value::Null | Value::Bool(_) => {}
        }
        Ok(())
    }

    fn check_string(&self, schema: &Map<String, Value>, s: &str, path: &str) -> Result<(), SchemaViolation> {
        let len = s.chars().count() as u64;
        if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
            if len < min {
                return Err(violation(path, format!("must be at least {min} characters")));
            }
        }
        if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
            if len > max {
                return Err(violation(path, format!("must be at most {max} characters")));
            }
        }
        if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
            let matches = self.patterns.get(pattern).is_some_and(|re| re.is_match(s));
            if !matches {
                return Err(violation(path, format!("must match pattern {pattern}")));
            }
        }
        Ok(())
    }

    fn check_array(&self, schema: &Map<String, Value>, items: &[Value], path: &str) -> Result<(), SchemaViolation> {
        let len = items.len() as u64;
        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if len < min {
                return Err(violation(path, format!("must have at least {min} items")));
            }
        }
        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if len > max {
                return Err(violation(path, format!("must have at most {max} items")));
            }
        }
        if let Some(item_schema) = schema.get("items") {
            for (i, item) in items.iter().enumerate() {
                self.check(item_schema, item, &format!("{path}/{i}"))?;
            }
        }
        Ok(())
    }

    fn check_object(
        &self,
        schema: &Map<String, Value>,
        fields: &Map<String, Value>,
        path: &str,
    ) -> Result<(), SchemaViolation> {
        if let Some(Value::Array(required)) = schema.get("required") {
            for name in required.iter().filter_map(Value::as_str) {
                if !fields.contains_key(name) {
                    return Err(violation(path, format!("missing required property '{name}'")));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        for (name, value) in fields {
            let child = format!("{path}/{}", escape_pointer(name));
            match properties.and_then(|p| p.get(name)) {
                Some(prop_schema) => self.check(prop_schema, value, &child)?,
                None => match schema.get("additionalProperties") {
                    Some(Value::Bool(false)) => {
                        return Err(violation(path, format!("unexpected property '{name}'")));
                    }
                    Some(extra @ Value::Object(_)) => self.check(extra, value, &child)?,
                    _ => {}
                },
            }
        }
        Ok(())
    }
}

/// Keywords this validator enforces.
const KEYWORDS: &[&str] = &[
    "type",
    "required",
    "properties",
    "additionalProperties",
    "items",
    "enum",
    "const",
    "pattern",
    "minLength",
    "maxLength",
    "minimum",
    "maximum",
    "minItems",
    "maxItems",
];

/// Keywords that carry no constraint.
const ANNOTATIONS: &[&str] = &["$schema", "$id", "$comment", "title", "description", "default", "examples"];

/// Check every keyword of a schema node and compile its patterns.
///
/// An unknown keyword is an error: ignoring it would accept instances the
/// schema author meant to reject.
fn compile_node(schema: &Value, at: &str, patterns: &mut HashMap<String, Regex>) -> Result<(), String> {
    let map = match schema {
        Value::Object(map) => map,
        Value::Bool(_) => return Ok(()),
        _ => return Err(format!("{}: schema must be an object or boolean", location(at))),
    };

    for (key, value) in map {
        let here = format!("{at}/{}", escape_pointer(key));
        match key.as_str() {
            "properties" => {
                let Value::Object(props) = value else {
                    return Err(format!("{}: must be an object", location(&here)));
                };
                for (name, prop) in props {
                    compile_node(prop, &format!("{here}/{}", escape_pointer(name)), patterns)?;
                }
            }
            "items" | "additionalProperties" => compile_node(value, &here, patterns)?,
            "pattern" => {
                let Value::String(pattern) = value else {
                    return Err(format!("{}: must be a string", location(&here)));
                };
                if !patterns.contains_key(pattern) {
                    let re = Regex::new(pattern).map_err(|e| format!("invalid pattern {pattern}: {e}"))?;
                    patterns.insert(pattern.clone(), re);
                }
            }
            k if KEYWORDS.contains(&k) || ANNOTATIONS.contains(&k) => {}
            other => return Err(format!("{}: unsupported keyword '{other}'", location(at))),
        }
    }
    Ok(())
}

fn location(at: &str) -> &str {
    if at.is_empty() { "/" } else { at }
}

fn check_type(expected: &Value, instance: &Value, path: &str) -> Result<(), SchemaViolation> {
    let names: Vec<&str> = match expected {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => return Ok(()),
    };
    if names.iter().any(|name| type_matches(name, instance)) {
        Ok(())
    } else {
        Err(violation(path, format!("must be of type {}", names.join(" or "))))
    }
}

fn type_matches(name: &str, instance: &Value) -> bool {
    match name {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => instance.is_i64() || instance.is_u64() || instance.as_f64().is_some_and(|f| f.fract() == 0.0),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        // Unknown type names never reject.
        _ => true,
    }
}

fn check_number(schema: &Map<String, Value>, n: f64, path: &str) -> Result<(), SchemaViolation> {
    if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
        if n < min {
            return Err(violation(path, format!("must be >= {min}")));
        }
    }
    if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
        if n > max {
            return Err(violation(path, format!("must be <= {max}")));
        }
    }
    Ok(())
}

fn violation(path: &str, message: impl Into<String>) -> SchemaViolation {
    SchemaViolation {
        path: path.to_string(),
        message: message.into(),
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn list(values: &[Value]) -> String {
    values.iter().map(Value::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn schema(value: Value) -> Schema {
        Schema::compile(value).unwrap()
    }

    #[test]
    fn test_type_and_required() {
        let s = schema(json!({
            "type": "object",
            "properties": {"gid": {"type": "string"}, "count": {"type": "integer"}},
            "required": ["gid"]
        }));

        assert!(s.validate(&json!({"gid": "a", "count": 3})).is_ok());
        assert!(s.validate(&json!([])).is_err());

        let err = s.validate(&json!({"count": 3})).unwrap_err();
        assert_eq!(err.message, "missing required property 'gid'");

        let err = s.validate(&json!({"gid": "a", "count": 1.5})).unwrap_err();
        assert_eq!(err.path, "/count");
    }

    #[test]
    fn test_type_list() {
        let s = schema(json!({"type": ["string", "null"]}));
        assert!(s.validate(&json!(null)).is_ok());
        assert!(s.validate(&json!("x")).is_ok());
        assert!(s.validate(&json!(1)).is_err());
    }

    #[test]
    fn test_string_constraints() {
        let s = schema(json!({"type": "string", "minLength": 2, "maxLength": 4, "pattern": "^[a-z]+$"}));
        assert!(s.validate(&json!("abc")).is_ok());
        assert!(s.validate(&json!("a")).is_err());
        assert!(s.validate(&json!("abcde")).is_err());
        assert!(s.validate(&json!("AB")).is_err());
    }

    #[test]
    fn test_numbers_enum_const() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "w": {"type": "integer", "minimum": 1, "maximum": 12},
                "width": {"enum": ["xs", "sm"]},
                "kind": {"const": "fixed"}
            }
        }));
        assert!(s.validate(&json!({"w": 12, "width": "sm", "kind": "fixed"})).is_ok());
        assert!(s.validate(&json!({"w": 13})).is_err());
        assert!(s.validate(&json!({"w": 0})).is_err());
        assert!(s.validate(&json!({"width": "xxl"})).is_err());
        assert!(s.validate(&json!({"kind": "other"})).is_err());
    }

    #[test]
    fn test_arrays_and_nested_paths() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "deps": {
                    "type": "array",
                    "maxItems": 2,
                    "items": {
                        "type": "object",
                        "properties": {"cid": {"type": "string"}},
                        "required": ["cid"],
                        "additionalProperties": false
                    }
                }
            }
        }));

        assert!(s.validate(&json!({"deps": [{"cid": "a"}]})).is_ok());

        let err = s.validate(&json!({"deps": [{"cid": "a"}, {"cid": 1}]})).unwrap_err();
        assert_eq!(err.path, "/deps/1/cid");
        assert_eq!(err.to_string(), "/deps/1/cid: must be of type string");

        let err = s.validate(&json!({"deps": [{"cid": "a", "extra": true}]})).unwrap_err();
        assert_eq!(err.message, "unexpected property 'extra'");

        assert!(s.validate(&json!({"deps": [{"cid": "a"}, {"cid": "b"}, {"cid": "c"}]})).is_err());
    }

    #[test]
    fn test_additional_properties_schema() {
        let s = schema(json!({"type": "object", "additionalProperties": {"type": "number"}}));
        assert!(s.validate(&json!({"a": 1, "b": 2.5})).is_ok());
        assert!(s.validate(&json!({"a": "x"})).is_err());
    }

    #[test]
    fn test_compile_rejects_bad_pattern() {
        assert!(Schema::compile(json!({"type": "string", "pattern": "("})).is_err());
        assert!(Schema::compile(json!("not an object")).is_err());
    }

    #[test]
    fn test_compile_rejects_unsupported_keywords() {
        for keyword in ["$ref", "oneOf", "anyOf", "allOf", "not", "patternProperties"] {
            let mut doc = json!({"type": "object"});
            doc[keyword] = json!({});
            let err = Schema::compile(doc).unwrap_err();
            assert!(err.contains(&format!("unsupported keyword '{keyword}'")), "{err}");
        }

        let nested = json!({
            "type": "object",
            "properties": {"deps": {"type": "array", "items": {"anyOf": [{"type": "string"}]}}}
        });
        let err = Schema::compile(nested).unwrap_err();
        assert_eq!(err, "/properties/deps/items: unsupported keyword 'anyOf'");
    }

    #[test]
    fn test_compile_accepts_annotations() {
        let s = schema(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "title": "Widget",
            "description": "A report widget",
            "type": "object",
            "properties": {"dynamicHeight": {"type": "boolean", "default": false}}
        }));
        assert!(s.validate(&json!({"dynamicHeight": true})).is_ok());
    }

    #[test]
    fn test_property_named_pattern_is_not_a_keyword() {
        let s = schema(json!({
            "type": "object",
            "properties": {"pattern": {"type": "string"}}
        }));
        assert!(s.validate(&json!({"pattern": "("})).is_ok());
    }
}
