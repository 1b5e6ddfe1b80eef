//! Content hashing for sections.
//!
//! Each section type depends on a fixed slice of the spec index. That slice is
//! serialized with object keys sorted and hashed with SHA-256, so the result
//! only moves when the content a section is built from moves.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use specdocs_shared::{Section, SectionType};
use specdocs_spec::SpecIndex;

/// Hash of the spec content `section` depends on.
pub fn section_hash(section: &Section, index: &SpecIndex) -> String {
    let input = match section.section_type {
        SectionType::Overview => overview_input(index),
        SectionType::Auth => to_value(&index.security),
        SectionType::EndpointGroup => endpoint_group_input(section, index),
        SectionType::Schemas => to_value(&index.schemas),
        SectionType::Errors => errors_input(index),
    };
    hash_value(&input)
}

/// Hash of the whole index.
pub fn spec_hash(index: &SpecIndex) -> String {
    hash_value(&to_value(index))
}

/// Hash of the free-form user instructions; empty when there are none.
pub fn instructions_hash(instructions: Option<&str>) -> String {
    match instructions {
        Some(text) if !text.is_empty() => sha256_hex(text),
        _ => String::new(),
    }
}

/// Serialize with every object's keys in sorted order.
pub fn canonical_json(value: &Value) -> String {
    // Serializing a `Value` cannot fail: all keys are strings.
    serde_json::to_string(&sort_keys(value)).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Per-type inputs
// ---------------------------------------------------------------------------

fn overview_input(index: &SpecIndex) -> Value {
    let tags: Vec<Value> = index
        .tags
        .iter()
        .map(|t| json!({"name": t.name, "description": t.description}))
        .collect();
    json!({
        "info": to_value(&index.info),
        "servers": index.servers,
        "tags": tags,
    })
}

fn endpoint_group_input(section: &Section, index: &SpecIndex) -> Value {
    // BTreeSet iteration is already lexicographic.
    let tags: Vec<Value> = section
        .related_tags
        .iter()
        .map(|tag| json!({"tag": tag, "endpoints": to_value(index.endpoints(tag))}))
        .collect();
    let schemas: Vec<Value> = section
        .related_schemas
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "definition": index.schemas.get(name).cloned().unwrap_or(Value::Null),
            })
        })
        .collect();
    json!({"tags": tags, "schemas": schemas})
}

fn errors_input(index: &SpecIndex) -> Value {
    to_value(&error_responses(index))
}

/// A 4xx or 5xx response declared by one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub path: String,
    pub method: String,
    pub status: String,
    pub response: Value,
}

/// Every error response in the index, sorted by canonical form.
///
/// An operation listed under several tags contributes its responses once.
pub fn error_responses(index: &SpecIndex) -> Vec<ErrorResponse> {
    let mut found: BTreeMap<String, ErrorResponse> = BTreeMap::new();
    for endpoint in index.all_endpoints() {
        let Some(responses) = endpoint.operation.get("responses").and_then(Value::as_object)
        else {
            continue;
        };
        for (status, response) in responses {
            if !(status.starts_with('4') || status.starts_with('5')) {
                continue;
            }
            let key = canonical_json(&json!([endpoint.path, endpoint.method, status, response]));
            found.entry(key).or_insert_with(|| ErrorResponse {
                path: endpoint.path.clone(),
                method: endpoint.method.clone(),
                status: status.clone(),
                response: response.clone(),
            });
        }
    }
    found.into_values().collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn hash_value(value: &Value) -> String {
    sha256_hex(&canonical_json(value))
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            let mut out = Map::with_capacity(sorted.len());
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
