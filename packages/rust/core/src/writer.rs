//! Writer collaborators: produce the body of one section.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use specdocs_shared::{Result, Section, SectionType, SpecDocsError, WrittenSection};
use specdocs_spec::{Endpoint, SpecIndex};

use crate::command;
use crate::hash;

/// Everything a writer may read besides the section itself.
#[derive(Debug, Clone)]
pub struct WriteContext {
    pub index: Arc<SpecIndex>,
    /// The full plan of the current run.
    pub plan: Arc<[Section]>,
    pub instructions: Option<String>,
}

/// Produces `{title, body}` for one section. The body excludes the level-one
/// title heading; the orchestrator adds it.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(&self, section: &Section, ctx: &WriteContext) -> Result<WrittenSection>;
}

// ---------------------------------------------------------------------------
// CommandWriter
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "type", rename = "write")]
struct WriteRequest<'a> {
    section: &'a Section,
    plan: &'a [Section],
    spec: &'a SpecIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

/// Writer backed by an external program, spawned once per section.
///
/// Request: `{"type": "write", "section": {...}, "plan": [...], "spec": {...}}`.
/// Reply: `{"type": "result", "title": "...", "body": "..."}` or
/// `{"type": "error", "error": "..."}`.
#[derive(Debug, Clone)]
pub struct CommandWriter {
    argv: Vec<String>,
}

impl CommandWriter {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl Writer for CommandWriter {
    #[instrument(skip_all, fields(section = %section.id))]
    async fn write(&self, section: &Section, ctx: &WriteContext) -> Result<WrittenSection> {
        let request = WriteRequest {
            section,
            plan: &ctx.plan,
            spec: &ctx.index,
            instructions: ctx.instructions.as_deref(),
        };
        command::run_json(&self.argv, &request)
            .await
            .map_err(|e| SpecDocsError::Writer(format!("{}: {e}", section.id)))
    }
}

// ---------------------------------------------------------------------------
// ReferenceWriter
// ---------------------------------------------------------------------------

/// Deterministic built-in writer rendering reference markdown straight from
/// the spec index.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceWriter;

#[async_trait]
impl Writer for ReferenceWriter {
    async fn write(&self, section: &Section, ctx: &WriteContext) -> Result<WrittenSection> {
        Ok(WrittenSection {
            title: section.title.clone(),
            body: reference_body(section, &ctx.index),
        })
    }
}

/// Markdown body for `section`, without its title heading.
pub fn reference_body(section: &Section, index: &SpecIndex) -> String {
    let mut out = String::new();
    match section.section_type {
        SectionType::Overview => overview(&mut out, index),
        SectionType::Auth => auth(&mut out, index),
        SectionType::EndpointGroup => endpoint_group(&mut out, section, index),
        SectionType::Schemas => schemas(&mut out, index),
        SectionType::Errors => errors(&mut out, index),
    }
    out
}

fn overview(out: &mut String, index: &SpecIndex) {
    let _ = writeln!(out, "**{}** version `{}`\n", index.info.title, index.info.version);
    if let Some(description) = &index.info.description {
        let _ = writeln!(out, "{}\n", description.trim());
    }

    if !index.servers.is_empty() {
        out.push_str("## Servers\n\n");
        for server in &index.servers {
            let url = server.get("url").and_then(Value::as_str).unwrap_or("");
            match server.get("description").and_then(Value::as_str) {
                Some(d) => {
                    let _ = writeln!(out, "- `{url}`: {d}");
                }
                None => {
                    let _ = writeln!(out, "- `{url}`");
                }
            }
        }
        out.push('\n');
    }

    if !index.tags.is_empty() {
        out.push_str("## Tags\n\n| Tag | Endpoints | Description |\n|---|---|---|\n");
        for tag in &index.tags {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                tag.name,
                index.endpoints(&tag.name).len(),
                table_cell(tag.description.as_deref().unwrap_or(""))
            );
        }
    }
}

fn auth(out: &mut String, index: &SpecIndex) {
    for scheme in &index.security {
        let def = &scheme.definition;
        let _ = writeln!(out, "## {}\n", scheme.name);
        for key in ["type", "scheme", "bearerFormat", "in", "name"] {
            if let Some(v) = def.get(key).and_then(Value::as_str) {
                let _ = writeln!(out, "- **{key}**: `{v}`");
            }
        }
        out.push('\n');
        if let Some(d) = def.get("description").and_then(Value::as_str) {
            let _ = writeln!(out, "{}\n", d.trim());
        }
        if let Some(flows) = def.get("flows") {
            json_block(out, flows);
        }
    }
}

fn endpoint_group(out: &mut String, section: &Section, index: &SpecIndex) {
    for tag in &section.related_tags {
        if let Some(d) = index
            .tags
            .iter()
            .find(|t| &t.name == tag)
            .and_then(|t| t.description.as_deref())
        {
            let _ = writeln!(out, "{}\n", d.trim());
        }
        for endpoint in index.endpoints(tag) {
            endpoint_doc(out, endpoint);
        }
    }

    for name in &section.related_schemas {
        if let Some(schema) = index.schemas.get(name) {
            let _ = writeln!(out, "## Schema {name}\n");
            json_block(out, schema);
        }
    }
}

fn endpoint_doc(out: &mut String, endpoint: &Endpoint) {
    let op = &endpoint.operation;
    let _ = writeln!(out, "## {} {}\n", endpoint.method.to_uppercase(), endpoint.path);
    if let Some(s) = op.get("summary").and_then(Value::as_str) {
        let _ = writeln!(out, "{}\n", s.trim());
    }
    if let Some(d) = op.get("description").and_then(Value::as_str) {
        let _ = writeln!(out, "{}\n", d.trim());
    }

    if let Some(params) = op.get("parameters").and_then(Value::as_array).filter(|p| !p.is_empty()) {
        out.push_str("### Parameters\n\n| Name | In | Required | Description |\n|---|---|---|---|\n");
        for p in params {
            let _ = writeln!(
                out,
                "| `{}` | {} | {} | {} |",
                p.get("name").and_then(Value::as_str).unwrap_or(""),
                p.get("in").and_then(Value::as_str).unwrap_or(""),
                if p.get("required").and_then(Value::as_bool).unwrap_or(false) { "yes" } else { "no" },
                table_cell(p.get("description").and_then(Value::as_str).unwrap_or("")),
            );
        }
        out.push('\n');
    }

    if let Some(body) = op.get("requestBody") {
        out.push_str("### Request body\n\n");
        json_block(out, body);
    }

    if let Some(responses) = op.get("responses").and_then(Value::as_object) {
        out.push_str("### Responses\n\n");
        for (status, response) in responses {
            let d = response.get("description").and_then(Value::as_str).unwrap_or("");
            let _ = writeln!(out, "- `{status}`: {}", d.trim());
        }
        out.push('\n');
    }
}

fn schemas(out: &mut String, index: &SpecIndex) {
    for (name, schema) in &index.schemas {
        let _ = writeln!(out, "## {name}\n");
        if let Some(d) = schema.get("description").and_then(Value::as_str) {
            let _ = writeln!(out, "{}\n", d.trim());
        }
        json_block(out, schema);
    }
}

fn errors(out: &mut String, index: &SpecIndex) {
    let mut found = hash::error_responses(index);
    found.sort_by(|a, b| a.status.cmp(&b.status));
    let mut current: Option<&str> = None;
    for err in &found {
        if current != Some(err.status.as_str()) {
            if current.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "## {}\n", err.status);
            current = Some(err.status.as_str());
        }
        let d = err.response.get("description").and_then(Value::as_str).unwrap_or("");
        let _ = writeln!(out, "- `{} {}`: {}", err.method.to_uppercase(), err.path, d.trim());
    }
}

fn json_block(out: &mut String, value: &Value) {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
    let _ = writeln!(out, "```json\n{pretty}\n```\n");
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
