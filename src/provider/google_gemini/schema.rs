//! JSON Schema normalization between the OpenAI structured-output dialect and
//! Gemini's stricter schema dialect.
//!
//! Gemini rejects multi-type unions expressed as `"type": [..]` and expects
//! lowercase type tags. [`normalize_schema`] rewrites a schema into that shape;
//! [`lowercase_schema_types`] is the case-only pass used when decoding a schema
//! that Gemini produced back into the canonical dialect.

use serde_json::{Map, Value};

use crate::types::ResponseFormat;

const NULL_TYPE: &str = "null";

/// Which rewrite a traversal performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Lowercase tags and rewrite multi-type unions to `anyOf`.
    Strict,
    /// Lowercase tags only.
    CaseOnly,
}

/// Nested schema positions, dispatched per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nested {
    /// `properties`: name → node.
    Properties,
    /// `items`: a node, or a tuple of nodes.
    Items,
    /// `anyOf` / `oneOf`: sequence of nodes.
    Union,
}

const NESTED_KEYS: [(&str, Nested); 4] = [
    ("properties", Nested::Properties),
    ("items", Nested::Items),
    ("anyOf", Nested::Union),
    ("oneOf", Nested::Union),
];

/// Rewrites `schema` for Gemini's strict dialect.
///
/// Total: shapes it does not understand pass through unchanged. The result
/// never shares structure with the input.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::schema::normalize_schema;
/// use serde_json::json;
///
/// let out = normalize_schema(&json!({"type": ["string", "integer"], "enum": ["a", 1]}));
/// assert_eq!(out, json!({"anyOf": [{"type": "string"}, {"type": "integer"}]}));
///
/// let nullable = json!({"type": ["string", "null"]});
/// assert_eq!(normalize_schema(&nullable), nullable);
/// ```
pub fn normalize_schema(schema: &Value) -> Value {
    rewrite(schema, Pass::Strict)
}

/// Lowercases every `type` tag at every depth without touching union structure.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::provider::google_gemini::schema::lowercase_schema_types;
/// use serde_json::json;
///
/// let out = lowercase_schema_types(&json!({"type": "OBJECT", "properties": {"a": {"type": ["STRING", "NULL"]}}}));
/// assert_eq!(out, json!({"type": "object", "properties": {"a": {"type": ["string", "null"]}}}));
/// ```
pub fn lowercase_schema_types(schema: &Value) -> Value {
    rewrite(schema, Pass::CaseOnly)
}

fn rewrite(node: &Value, pass: Pass) -> Value {
    let Value::Object(map) = node else {
        return node.clone();
    };

    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        if key == "type" {
            continue;
        }
        out.insert(key.clone(), value.clone());
    }

    if let Some(type_value) = map.get("type") {
        match pass {
            Pass::Strict => apply_strict_type(&mut out, type_value),
            Pass::CaseOnly => {
                out.insert("type".to_string(), lowercase_type(type_value));
            }
        }
    }

    for (key, nested) in NESTED_KEYS {
        if let Some(child) = out.get(key) {
            let rebuilt = rewrite_nested(nested, child, pass);
            out.insert(key.to_string(), rebuilt);
        }
    }

    Value::Object(out)
}

fn rewrite_nested(nested: Nested, child: &Value, pass: Pass) -> Value {
    match (nested, child) {
        (Nested::Properties, Value::Object(properties)) => Value::Object(
            properties
                .iter()
                .map(|(name, schema)| (name.clone(), rewrite(schema, pass)))
                .collect(),
        ),
        (Nested::Items, Value::Object(_)) => rewrite(child, pass),
        (Nested::Items, Value::Array(tuple)) | (Nested::Union, Value::Array(tuple)) => {
            Value::Array(tuple.iter().map(|schema| rewrite(schema, pass)).collect())
        }
        _ => child.clone(),
    }
}

fn lowercase_type(type_value: &Value) -> Value {
    match type_value {
        Value::String(tag) => Value::String(tag.to_lowercase()),
        Value::Array(tags) => Value::Array(
            tags.iter()
                .map(|tag| match tag {
                    Value::String(tag) => Value::String(tag.to_lowercase()),
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn apply_strict_type(out: &mut Map<String, Value>, type_value: &Value) {
    let tags = match type_value {
        Value::String(tag) => {
            out.insert("type".to_string(), Value::String(tag.to_lowercase()));
            return;
        }
        Value::Array(tags) => tags,
        other => {
            out.insert("type".to_string(), other.clone());
            return;
        }
    };

    let mut non_null = Vec::with_capacity(tags.len());
    let mut has_null = false;
    for tag in tags {
        let Value::String(tag) = tag else {
            out.insert("type".to_string(), type_value.clone());
            return;
        };
        let tag = tag.to_lowercase();
        if tag == NULL_TYPE {
            has_null = true;
        } else {
            non_null.push(tag);
        }
    }

    match (non_null.len(), has_null) {
        (0, false) => {
            out.insert("type".to_string(), type_value.clone());
        }
        (0, true) => {
            out.insert("type".to_string(), Value::String(NULL_TYPE.to_string()));
        }
        (1, false) => {
            out.insert("type".to_string(), Value::String(non_null.remove(0)));
        }
        (1, true) => {
            out.insert(
                "type".to_string(),
                Value::Array(vec![
                    Value::String(non_null.remove(0)),
                    Value::String(NULL_TYPE.to_string()),
                ]),
            );
        }
        _ => {
            let mut branches: Vec<Value> = non_null
                .into_iter()
                .map(|tag| single_type(&tag))
                .collect();
            if has_null {
                branches.push(single_type(NULL_TYPE));
            }
            out.remove("enum");
            out.insert("anyOf".to_string(), Value::Array(branches));
        }
    }
}

fn single_type(tag: &str) -> Value {
    let mut branch = Map::new();
    branch.insert("type".to_string(), Value::String(tag.to_string()));
    Value::Object(branch)
}

/// Rebuilds the unified structured-output format from a Gemini generation config.
///
/// A schema wins over the bare JSON MIME type; the schema is decoded with the
/// case-only pass and named after its `title` when present.
pub fn response_format_from_gemini(
    response_mime_type: Option<&str>,
    response_schema: Option<&Value>,
) -> Option<ResponseFormat> {
    if let Some(schema) = response_schema {
        let name = schema
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("response_schema")
            .to_string();
        return Some(ResponseFormat::JsonSchema {
            name: Some(name),
            schema: lowercase_schema_types(schema),
            strict: Some(false),
        });
    }
    match response_mime_type {
        Some(mime) if mime.eq_ignore_ascii_case("application/json") => {
            Some(ResponseFormat::JsonObject)
        }
        _ => None,
    }
}
