//! Local `$ref` dereferencing.
//!
//! Every `{"$ref": "#/..."}` node is replaced by a resolved copy of its
//! target. Resolved targets are kept in an arena keyed by reference so each
//! one is expanded once. A reference met again while its own expansion is
//! still in progress is left as a `{"$ref": ...}` marker, which bounds the
//! output on cyclic schemas.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use specdocs_shared::{Result, SpecDocsError};

pub(crate) struct Resolver<'a> {
    root: &'a Value,
    resolved: HashMap<String, Value>,
    in_progress: HashSet<String>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(root: &'a Value) -> Self {
        Self {
            root,
            resolved: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Return a copy of `value` with every reference substituted.
    pub(crate) fn resolve(&mut self, value: &Value) -> Result<Value> {
        match value {
            Value::Object(map) => {
                // Siblings of `$ref` are ignored, as in OpenAPI 3.0.
                if let Some(Value::String(reference)) = map.get("$ref") {
                    return self.resolve_ref(reference);
                }
                let mut out = Map::with_capacity(map.len());
                for (key, child) in map {
                    out.insert(key.clone(), self.resolve(child)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_ref(&mut self, reference: &str) -> Result<Value> {
        if let Some(done) = self.resolved.get(reference) {
            return Ok(done.clone());
        }

        if self.in_progress.contains(reference) {
            debug!(reference, "cyclic reference, leaving marker");
            return Ok(ref_marker(reference));
        }

        let pointer = reference.strip_prefix('#').ok_or_else(|| {
            SpecDocsError::parse(format!("external reference not supported: {reference}"))
        })?;
        let target = self
            .root
            .pointer(pointer)
            .ok_or_else(|| SpecDocsError::parse(format!("unresolved reference: {reference}")))?;

        self.in_progress.insert(reference.to_string());
        let result = self.resolve(target);
        self.in_progress.remove(reference);

        let value = result?;
        self.resolved.insert(reference.to_string(), value.clone());
        Ok(value)
    }
}

fn ref_marker(reference: &str) -> Value {
    let mut map = Map::new();
    map.insert("$ref".into(), Value::String(reference.to_string()));
    Value::Object(map)
}
