//! Core domain types for specdocs builds.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current version of the manifest format.
pub const MANIFEST_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying a single generation run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// Kind of content a section covers; selects the spec inputs it is hashed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionType {
    Overview,
    Auth,
    EndpointGroup,
    Schemas,
    Errors,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Auth => "auth",
            Self::EndpointGroup => "endpoint-group",
            Self::Schemas => "schemas",
            Self::Errors => "errors",
        }
    }
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned unit of output content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Unique within a plan.
    pub id: String,
    pub title: String,
    /// Relative, slash-separated destination (e.g., `endpoints/pets.md`).
    pub output_path: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub related_tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub related_schemas: BTreeSet<String>,
    /// Display and processing order.
    #[serde(default)]
    pub order: i64,
    /// Navigation group label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Section {
    /// Convenience constructor for a section with no tag/schema dependencies.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        output_path: impl Into<String>,
        section_type: SectionType,
        order: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            output_path: output_path.into(),
            section_type,
            related_tags: BTreeSet::new(),
            related_schemas: BTreeSet::new(),
            order,
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_schemas = schemas.into_iter().map(Into::into).collect();
        self
    }
}

/// Body produced by a writer for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenSection {
    pub title: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// The persisted record of the last build, stored inside the output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    pub spec_hash: String,
    pub instructions_hash: String,
    /// Keyed by section id; a `BTreeMap` keeps the file diff-stable.
    #[serde(default)]
    pub sections: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new(spec_hash: impl Into<String>, instructions_hash: impl Into<String>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            spec_hash: spec_hash.into(),
            instructions_hash: instructions_hash.into(),
            sections: BTreeMap::new(),
        }
    }

    /// Entries in plan order (by `order`, then id).
    pub fn ordered_entries(&self) -> Vec<(&str, &ManifestEntry)> {
        let mut entries: Vec<_> = self
            .sections
            .iter()
            .map(|(id, entry)| (id.as_str(), entry))
            .collect();
        entries.sort_by(|a, b| {
            let oa = a.1.order.unwrap_or(i64::MAX);
            let ob = b.1.order.unwrap_or(i64::MAX);
            oa.cmp(&ob).then_with(|| a.0.cmp(b.0))
        });
        entries
    }
}

/// State recorded for one section id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Empty when the last writer call for this section failed.
    pub content_hash: String,
    pub output_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub generated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// A second or third level heading extracted from a section body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub slug: String,
}

/// A navigation link to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub title: String,
    pub href: String,
    pub active: bool,
    /// Only set on the active item of the page being rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toc: Option<Vec<Heading>>,
}

/// Top-level navigation entry. Built per render, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NavEntry {
    Item(NavItem),
    Group { label: String, items: Vec<NavItem> },
}
