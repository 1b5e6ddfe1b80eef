//! Flat, fully dereferenced view of an OpenAPI 3.x or Swagger 2.0 document.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use specdocs_shared::{Result, SpecDocsError};

use crate::resolve::Resolver;

/// HTTP methods that may appear under a path item, in display order.
const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Tag assigned to operations that declare none.
pub const DEFAULT_TAG: &str = "default";

/// Which of the two supported document versions was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecVersion {
    Swagger2,
    OpenApi3,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecInfo {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One operation, with every reference resolved inline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    pub path: String,
    pub method: String,
    pub operation: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityScheme {
    pub name: String,
    pub definition: Value,
}

/// Queryable in-memory index of a specification. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecIndex {
    #[serde(skip)]
    pub spec_version: Option<SpecVersion>,
    pub info: SpecInfo,
    pub servers: Vec<Value>,
    pub tags: Vec<TagInfo>,
    pub schemas: BTreeMap<String, Value>,
    pub paths_by_tag: BTreeMap<String, Vec<Endpoint>>,
    pub security: Vec<SecurityScheme>,
}

impl SpecIndex {
    /// Endpoints registered under `tag`, or an empty slice.
    pub fn endpoints(&self, tag: &str) -> &[Endpoint] {
        self.paths_by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate every endpoint across all tags. An operation carrying several
    /// tags is yielded once per tag.
    pub fn all_endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.tags.iter().flat_map(|tag| self.endpoints(&tag.name).iter())
    }
}

/// Build a [`SpecIndex`] from a parsed document.
#[instrument(skip_all)]
pub fn build_index(doc: &Value) -> Result<SpecIndex> {
    let root = doc
        .as_object()
        .ok_or_else(|| SpecDocsError::parse("document root is not an object"))?;
    let version = detect_version(root)?;

    let mut resolver = Resolver::new(doc);

    let info = read_info(root)?;
    let servers = match version {
        SpecVersion::OpenApi3 => match root.get("servers") {
            Some(servers) => as_array(&resolver.resolve(servers)?, "servers")?.clone(),
            None => Vec::new(),
        },
        SpecVersion::Swagger2 => swagger_servers(root),
    };

    let (schemas_pointer, security_node) = match version {
        SpecVersion::OpenApi3 => (
            "/components/schemas",
            doc.pointer("/components/securitySchemes"),
        ),
        SpecVersion::Swagger2 => ("/definitions", root.get("securityDefinitions")),
    };

    // Schemas go through their own reference so a self-referencing schema is
    // already in progress when its body is expanded.
    let mut schemas = BTreeMap::new();
    if let Some(node) = doc.pointer(schemas_pointer) {
        for name in as_object(node, "schemas")?.keys() {
            let reference = format!("#{schemas_pointer}/{}", escape_pointer(name));
            schemas.insert(name.clone(), resolver.resolve(&json!({ "$ref": reference }))?);
        }
    }

    let mut security = Vec::new();
    if let Some(node) = security_node {
        for (name, scheme) in as_object(node, "security schemes")? {
            security.push(SecurityScheme {
                name: name.clone(),
                definition: resolver.resolve(scheme)?,
            });
        }
    }

    let mut tags = read_declared_tags(root, &mut resolver)?;
    let paths_by_tag = read_paths(root, &mut resolver, &mut tags)?;

    info!(
        ?version,
        title = %info.title,
        tags = tags.len(),
        schemas = schemas.len(),
        endpoints = paths_by_tag.values().map(Vec::len).sum::<usize>(),
        "spec index built"
    );

    Ok(SpecIndex {
        spec_version: Some(version),
        info,
        servers,
        tags,
        schemas,
        paths_by_tag,
        security,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn detect_version(root: &Map<String, Value>) -> Result<SpecVersion> {
    if let Some(v) = root.get("openapi").and_then(Value::as_str) {
        if v.starts_with("3.") {
            return Ok(SpecVersion::OpenApi3);
        }
        return Err(SpecDocsError::parse(format!("unsupported openapi version: {v}")));
    }
    if let Some(v) = root.get("swagger").and_then(Value::as_str) {
        if v == "2.0" {
            return Ok(SpecVersion::Swagger2);
        }
        return Err(SpecDocsError::parse(format!("unsupported swagger version: {v}")));
    }
    Err(SpecDocsError::parse(
        "unrecognized document: missing `openapi` or `swagger` field",
    ))
}

fn read_info(root: &Map<String, Value>) -> Result<SpecInfo> {
    let info = root
        .get("info")
        .and_then(Value::as_object)
        .ok_or_else(|| SpecDocsError::parse("missing `info` object"))?;

    Ok(SpecInfo {
        title: str_field(info, "title").unwrap_or_else(|| "API".into()),
        version: scalar_field(info, "version").unwrap_or_default(),
        description: str_field(info, "description"),
    })
}

/// Swagger 2.0 describes a single server as `schemes` + `host` + `basePath`.
fn swagger_servers(root: &Map<String, Value>) -> Vec<Value> {
    let base_path = str_field(root, "basePath").unwrap_or_default();
    let Some(host) = str_field(root, "host") else {
        if base_path.is_empty() {
            return Vec::new();
        }
        return vec![json!({ "url": base_path })];
    };

    let schemes: Vec<String> = root
        .get("schemes")
        .and_then(Value::as_array)
        .map(|s| s.iter().filter_map(Value::as_str).map(String::from).collect())
        .filter(|s: &Vec<String>| !s.is_empty())
        .unwrap_or_else(|| vec!["https".into()]);

    schemes
        .into_iter()
        .map(|scheme| json!({ "url": format!("{scheme}://{host}{base_path}") }))
        .collect()
}

fn read_declared_tags(root: &Map<String, Value>, resolver: &mut Resolver) -> Result<Vec<TagInfo>> {
    let Some(node) = root.get("tags") else {
        return Ok(Vec::new());
    };

    let resolved = resolver.resolve(node)?;
    let mut tags: Vec<TagInfo> = Vec::new();
    for tag in as_array(&resolved, "tags")? {
        let obj = as_object(tag, "tag")?;
        let name = str_field(obj, "name")
            .ok_or_else(|| SpecDocsError::parse("tag without a `name`"))?;
        if tags.iter().any(|t| t.name == name) {
            debug!(%name, "duplicate tag declaration ignored");
            continue;
        }
        tags.push(TagInfo {
            name,
            description: str_field(obj, "description"),
        });
    }
    Ok(tags)
}

fn read_paths(
    root: &Map<String, Value>,
    resolver: &mut Resolver,
    tags: &mut Vec<TagInfo>,
) -> Result<BTreeMap<String, Vec<Endpoint>>> {
    let mut paths_by_tag: BTreeMap<String, Vec<Endpoint>> = BTreeMap::new();

    let Some(paths) = root.get("paths") else {
        return Ok(paths_by_tag);
    };

    for (path, item) in as_object(paths, "paths")? {
        let item = resolver.resolve(item)?;
        let item = as_object(&item, "path item")?;
        let shared_params = item
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for method in HTTP_METHODS {
            let Some(operation) = item.get(method) else {
                continue;
            };
            let mut operation = operation.clone();
            merge_path_parameters(&mut operation, &shared_params);

            let op_tags: Vec<String> = operation
                .get("tags")
                .and_then(Value::as_array)
                .map(|t| t.iter().filter_map(Value::as_str).map(String::from).collect())
                .filter(|t: &Vec<String>| !t.is_empty())
                .unwrap_or_else(|| vec![DEFAULT_TAG.to_string()]);

            for tag in op_tags {
                if !tags.iter().any(|t| t.name == tag) {
                    tags.push(TagInfo {
                        name: tag.clone(),
                        description: None,
                    });
                }
                paths_by_tag.entry(tag).or_default().push(Endpoint {
                    path: path.clone(),
                    method: method.to_string(),
                    operation: operation.clone(),
                });
            }
        }
    }

    Ok(paths_by_tag)
}

/// Add path-level parameters an operation does not redefine by `(name, in)`.
fn merge_path_parameters(operation: &mut Value, shared: &[Value]) {
    if shared.is_empty() {
        return;
    }
    let Some(op) = operation.as_object_mut() else {
        return;
    };

    let key = |p: &Value| {
        (
            p.get("name").and_then(Value::as_str).map(String::from),
            p.get("in").and_then(Value::as_str).map(String::from),
        )
    };

    let params = op
        .entry("parameters")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(list) = params {
        let existing: Vec<_> = list.iter().map(key).collect();
        let inherited: Vec<Value> = shared
            .iter()
            .filter(|p| !existing.contains(&key(*p)))
            .cloned()
            .collect();
        list.splice(0..0, inherited);
    }
}

/// Escape a key for use as a JSON pointer segment.
fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}

/// Like [`str_field`], but also accepts numbers, which YAML produces for an
/// unquoted `version: 1.0`.
fn scalar_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_object<'v>(value: &'v Value, what: &str) -> Result<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| SpecDocsError::parse(format!("{what} must be an object")))
}

fn as_array<'v>(value: &'v Value, what: &str) -> Result<&'v Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| SpecDocsError::parse(format!("{what} must be an array")))
}
