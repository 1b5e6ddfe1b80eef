//! Planner collaborators: turn a spec index into an ordered section list.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use specdocs_shared::{Result, Section, SectionType, SpecDocsError, slugify};
use specdocs_spec::SpecIndex;

use crate::command;
use crate::hash;

/// Navigation group label for per-tag endpoint sections.
pub const ENDPOINTS_GROUP: &str = "Endpoints";

/// Produces the section plan for a run.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, index: &SpecIndex, instructions: Option<&str>) -> Result<Vec<Section>>;
}

// ---------------------------------------------------------------------------
// TagPlanner
// ---------------------------------------------------------------------------

/// Deterministic built-in planner: one section per concern and one per tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagPlanner;

#[async_trait]
impl Planner for TagPlanner {
    async fn plan(&self, index: &SpecIndex, _instructions: Option<&str>) -> Result<Vec<Section>> {
        Ok(tag_plan(index))
    }
}

/// The plan [`TagPlanner`] produces.
pub fn tag_plan(index: &SpecIndex) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut order = 0;
    let mut next_order = || {
        let current = order;
        order += 1;
        current
    };

    sections.push(Section::new(
        "overview",
        "Overview",
        "index.md",
        SectionType::Overview,
        next_order(),
    ));

    if !index.security.is_empty() {
        sections.push(Section::new(
            "authentication",
            "Authentication",
            "authentication.md",
            SectionType::Auth,
            next_order(),
        ));
    }

    let mut used_slugs = HashSet::new();
    for (i, tag) in index.tags.iter().enumerate() {
        if index.endpoints(&tag.name).is_empty() {
            continue;
        }
        let slug = unique_slug(&tag.name, i, &mut used_slugs);
        sections.push(
            Section::new(
                format!("endpoints-{slug}"),
                tag.name.clone(),
                format!("endpoints/{slug}.md"),
                SectionType::EndpointGroup,
                next_order(),
            )
            .with_group(ENDPOINTS_GROUP)
            .with_tags([tag.name.clone()]),
        );
    }

    if !index.schemas.is_empty() {
        sections.push(Section::new(
            "schemas",
            "Schemas",
            "schemas.md",
            SectionType::Schemas,
            next_order(),
        ));
    }

    if !hash::error_responses(index).is_empty() {
        sections.push(Section::new(
            "errors",
            "Errors",
            "errors.md",
            SectionType::Errors,
            next_order(),
        ));
    }

    debug!(sections = sections.len(), "tag plan built");
    sections
}

/// Slug for a tag's file name, falling back to its position and
/// disambiguating collisions such as `Pets` and `pets`.
fn unique_slug(name: &str, position: usize, used: &mut HashSet<String>) -> String {
    let base = match slugify(name) {
        s if s.is_empty() => format!("tag-{}", position + 1),
        s => s,
    };
    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    candidate
}

// ---------------------------------------------------------------------------
// CommandPlanner
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "type", rename = "plan")]
struct PlanRequest<'a> {
    spec: &'a SpecIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

#[derive(Deserialize)]
struct PlanResponse {
    sections: Vec<Section>,
}

/// Planner backed by an external program speaking the JSON bridge protocol.
///
/// Request: `{"type": "plan", "spec": {...}, "instructions": "..."}`.
/// Reply: `{"type": "result", "sections": [...]}` or
/// `{"type": "error", "error": "..."}`.
#[derive(Debug, Clone)]
pub struct CommandPlanner {
    argv: Vec<String>,
}

impl CommandPlanner {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl Planner for CommandPlanner {
    #[instrument(skip_all, fields(cmd = ?self.argv))]
    async fn plan(&self, index: &SpecIndex, instructions: Option<&str>) -> Result<Vec<Section>> {
        let request = PlanRequest {
            spec: index,
            instructions,
        };
        let response: PlanResponse = command::run_json(&self.argv, &request)
            .await
            .map_err(SpecDocsError::Planner)?;
        info!(sections = response.sections.len(), "external planner returned plan");
        Ok(response.sections)
    }
}
