use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use specdocs_core::hash::section_hash;
use specdocs_core::{
    GenerateConfig, GenerateOutcome, Planner, ReferenceWriter, SilentProgress, TagPlanner,
    WriteContext, Writer, generate, generate_with_index, manifest,
};
use specdocs_shared::{
    Manifest, ManifestEntry, Result, Section, SectionType, SpecDocsError, WrittenSection,
};
use specdocs_spec::{SpecIndex, build_index};

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

struct FixedPlanner(Vec<Section>);

#[async_trait]
impl Planner for FixedPlanner {
    async fn plan(&self, _index: &SpecIndex, _instructions: Option<&str>) -> Result<Vec<Section>> {
        Ok(self.0.clone())
    }
}

/// Records every call and fails for the listed ids.
#[derive(Default)]
struct RecordingWriter {
    calls: Mutex<Vec<String>>,
    fail: Vec<String>,
}

impl RecordingWriter {
    fn failing(ids: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }

    fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Writer for RecordingWriter {
    async fn write(&self, section: &Section, ctx: &WriteContext) -> Result<WrittenSection> {
        self.calls.lock().unwrap().push(section.id.clone());
        if self.fail.contains(&section.id) {
            return Err(SpecDocsError::Writer(format!("{} refused", section.id)));
        }
        Ok(WrittenSection {
            title: section.title.clone(),
            body: format!(
                "## Details\n\nBody for {} ({} planned).",
                section.id,
                ctx.plan.len()
            ),
        })
    }
}

/// Tracks the highest number of concurrent calls.
#[derive(Default)]
struct SlowWriter {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Writer for SlowWriter {
    async fn write(&self, section: &Section, _ctx: &WriteContext) -> Result<WrittenSection> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(WrittenSection {
            title: section.title.clone(),
            body: String::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn temp_root(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("specdocs-{label}-{}", uuid::Uuid::now_v7()))
}

fn spec(order_schema: Value) -> SpecIndex {
    build_index(&json!({
        "openapi": "3.0.3",
        "info": {"title": "Petstore", "version": "1.0.0"},
        "tags": [{"name": "pets"}, {"name": "store"}],
        "paths": {
            "/pets": {"get": {"tags": ["pets"], "responses": {"200": {"description": "ok"}}}},
            "/orders": {
                "post": {
                    "tags": ["store"],
                    "requestBody": {"content": {"application/json": {
                        "schema": {"$ref": "#/components/schemas/Order"}
                    }}},
                    "responses": {"201": {"description": "created"}}
                }
            }
        },
        "components": {
            "schemas": {
                "Pet": {"type": "object"},
                "Order": order_schema
            }
        }
    }))
    .expect("index")
}

fn base_spec() -> SpecIndex {
    spec(json!({"type": "object", "properties": {"qty": {"type": "integer"}}}))
}

fn changed_spec() -> SpecIndex {
    spec(json!({"type": "object", "properties": {"qty": {"type": "string"}}}))
}

fn three_sections() -> Vec<Section> {
    vec![
        Section::new("a", "Alpha", "a.md", SectionType::Overview, 0),
        Section::new("b", "Beta", "nested/b.md", SectionType::EndpointGroup, 1).with_tags(["pets"]),
        Section::new("c", "Gamma", "c.md", SectionType::Schemas, 2),
    ]
}

async fn run_with(
    index: SpecIndex,
    config: &GenerateConfig,
    planner: &dyn Planner,
    writer: Arc<dyn Writer>,
) -> specdocs_core::GenerateResult {
    generate_with_index(index, config, planner, writer, &SilentProgress)
        .await
        .expect("generate")
}

fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).expect("read output")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_run_writes_every_section() {
    let root = temp_root("first");
    let config = GenerateConfig::new(&root);
    let writer = Arc::new(RecordingWriter::default());

    let result = run_with(base_spec(), &config, &FixedPlanner(three_sections()), writer.clone()).await;

    assert_eq!(result.outcome, GenerateOutcome::Generated);
    assert_eq!(result.planned, 3);
    assert_eq!(result.regenerated, 3);
    assert_eq!(result.cached, 0);
    assert!(result.failed.is_empty());
    assert_eq!(writer.calls(), vec!["a", "b", "c"]);

    let b = read(&root, "nested/b.md");
    assert!(b.starts_with("# Beta\n\n## Details"));
    assert!(b.contains("(3 planned)"));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn second_identical_run_writes_nothing() {
    let root = temp_root("idempotent");
    let config = GenerateConfig::new(&root);
    let planner = FixedPlanner(three_sections());
    let writer = Arc::new(RecordingWriter::default());

    run_with(base_spec(), &config, &planner, writer.clone()).await;
    let manifest_before = std::fs::read_to_string(manifest::manifest_path(&root)).unwrap();
    writer.reset();

    let result = run_with(base_spec(), &config, &planner, writer.clone()).await;

    assert_eq!(result.outcome, GenerateOutcome::UpToDate);
    assert_eq!(result.regenerated, 0);
    assert!(writer.calls().is_empty());
    let manifest_after = std::fs::read_to_string(manifest::manifest_path(&root)).unwrap();
    assert_eq!(manifest_before, manifest_after);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn manifest_has_one_fresh_entry_per_section() {
    let root = temp_root("complete");
    let config = GenerateConfig::new(&root);
    let plan = three_sections();
    let writer = Arc::new(RecordingWriter::default());

    run_with(base_spec(), &config, &FixedPlanner(plan.clone()), writer).await;

    let stored = manifest::load(&root).expect("manifest");
    assert_eq!(stored.version, 1);
    assert_eq!(stored.sections.len(), plan.len());
    let index = base_spec();
    for section in &plan {
        let entry = &stored.sections[&section.id];
        assert_eq!(entry.content_hash, section_hash(section, &index));
        assert_eq!(entry.output_path, section.output_path);
        assert_eq!(entry.title.as_deref(), Some(section.title.as_str()));
        assert_eq!(entry.order, Some(section.order));
    }

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn spec_change_regenerates_only_affected_sections() {
    let root = temp_root("partial");
    let config = GenerateConfig::new(&root);
    let planner = FixedPlanner(three_sections());
    let writer = Arc::new(RecordingWriter::default());

    run_with(base_spec(), &config, &planner, writer.clone()).await;
    writer.reset();

    let result = run_with(changed_spec(), &config, &planner, writer.clone()).await;

    // Only the schemas section reads the Order schema.
    assert_eq!(result.outcome, GenerateOutcome::Generated);
    assert_eq!(writer.calls(), vec!["c"]);
    assert_eq!(result.cached, 2);
    assert_eq!(result.regenerated, 1);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn unaffected_spec_change_only_refreshes_metadata() {
    let root = temp_root("metadata");
    let config = GenerateConfig::new(&root);
    let writer = Arc::new(RecordingWriter::default());
    let overview = Section::new("a", "Alpha", "a.md", SectionType::Overview, 0);

    run_with(base_spec(), &config, &FixedPlanner(vec![overview.clone()]), writer.clone()).await;
    writer.reset();

    let regrouped = overview.with_group("Intro");
    let result = run_with(
        changed_spec(),
        &config,
        &FixedPlanner(vec![regrouped]),
        writer.clone(),
    )
    .await;

    assert_eq!(result.outcome, GenerateOutcome::MetadataRefreshed);
    assert!(writer.calls().is_empty());
    let stored = manifest::load(&root).unwrap();
    assert_eq!(stored.sections["a"].group.as_deref(), Some("Intro"));
    assert_eq!(stored.spec_hash, specdocs_core::hash::spec_hash(&changed_spec()));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn instructions_change_regenerates_everything() {
    let root = temp_root("instructions");
    let mut config = GenerateConfig::new(&root);
    let planner = FixedPlanner(three_sections());
    let writer = Arc::new(RecordingWriter::default());

    run_with(base_spec(), &config, &planner, writer.clone()).await;
    writer.reset();

    config.instructions = Some("Use a friendly tone.".into());
    let result = run_with(base_spec(), &config, &planner, writer.clone()).await;

    assert_eq!(result.regenerated, 3);
    assert_eq!(writer.calls(), vec!["a", "b", "c"]);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn force_regenerates_everything() {
    let root = temp_root("force");
    let mut config = GenerateConfig::new(&root);
    let planner = FixedPlanner(three_sections());
    let writer = Arc::new(RecordingWriter::default());

    run_with(base_spec(), &config, &planner, writer.clone()).await;
    writer.reset();

    config.force = true;
    let result = run_with(base_spec(), &config, &planner, writer.clone()).await;
    assert_eq!(result.outcome, GenerateOutcome::Generated);
    assert_eq!(writer.calls().len(), 3);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn dropped_section_file_is_removed() {
    let root = temp_root("orphan");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("old.md"), "# Old\n").unwrap();

    let mut previous = Manifest::new("older-spec", "");
    previous.sections.insert(
        "old".into(),
        ManifestEntry {
            content_hash: "whatever".into(),
            output_path: "old.md".into(),
            title: Some("Old".into()),
            group: None,
            order: Some(0),
            generated_at: Utc::now(),
        },
    );
    previous.sections.insert(
        "gone".into(),
        ManifestEntry {
            content_hash: "whatever".into(),
            output_path: "never-written.md".into(),
            title: None,
            group: None,
            order: Some(1),
            generated_at: Utc::now(),
        },
    );
    manifest::save(&root, &previous).unwrap();

    let config = GenerateConfig::new(&root);
    let writer = Arc::new(RecordingWriter::default());
    let result = run_with(base_spec(), &config, &FixedPlanner(three_sections()), writer).await;

    assert!(!root.join("old.md").exists());
    assert_eq!(result.orphans_removed, 1);
    let stored = manifest::load(&root).unwrap();
    assert!(!stored.sections.contains_key("old"));
    assert_eq!(stored.sections.len(), 3);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn dropped_section_is_removed_when_rest_is_cached() {
    let root = temp_root("orphan-cached");
    let config = GenerateConfig::new(&root);
    let writer = Arc::new(RecordingWriter::default());

    run_with(base_spec(), &config, &FixedPlanner(three_sections()), writer.clone()).await;
    assert!(root.join("c.md").exists());
    writer.reset();

    // The Order change only touches the dropped schemas section, so the
    // remaining sections stay cached.
    let kept: Vec<Section> = three_sections().into_iter().filter(|s| s.id != "c").collect();
    let result = run_with(changed_spec(), &config, &FixedPlanner(kept), writer.clone()).await;

    assert_eq!(result.outcome, GenerateOutcome::MetadataRefreshed);
    assert_eq!(result.cached, 2);
    assert_eq!(result.orphans_removed, 1);
    assert!(writer.calls().is_empty());
    assert!(!root.join("c.md").exists());
    assert!(root.join("a.md").exists());
    assert!(root.join("nested/b.md").exists());
    let stored = manifest::load(&root).unwrap();
    assert_eq!(stored.sections.len(), 2);
    assert!(!stored.sections.contains_key("c"));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn failed_section_does_not_affect_siblings() {
    let root = temp_root("isolation");
    let config = GenerateConfig::new(&root);
    let planner = FixedPlanner(three_sections());
    let writer = Arc::new(RecordingWriter::failing(&["b"]));

    let result = run_with(base_spec(), &config, &planner, writer.clone()).await;

    assert_eq!(result.failed, vec!["b".to_string()]);
    assert_eq!(result.regenerated, 2);
    assert!(root.join("a.md").exists());
    assert!(root.join("c.md").exists());
    assert!(!root.join("nested/b.md").exists());

    // The failed section is recorded without a hash so it is retried.
    let stored = manifest::load(&root).unwrap();
    assert_eq!(stored.sections.len(), 3);
    assert_eq!(stored.sections["b"].content_hash, "");

    let retry = Arc::new(RecordingWriter::default());
    let result = run_with(base_spec(), &config, &planner, retry.clone()).await;
    assert_eq!(result.outcome, GenerateOutcome::Generated);
    assert_eq!(retry.calls(), vec!["b"]);
    assert!(root.join("nested/b.md").exists());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn refresh_failed_hashes_stores_new_hash() {
    let root = temp_root("refresh-failed");
    let mut config = GenerateConfig::new(&root);
    config.refresh_failed_hashes = true;
    let planner = FixedPlanner(three_sections());

    let writer = Arc::new(RecordingWriter::failing(&["b"]));
    run_with(base_spec(), &config, &planner, writer).await;

    let stored = manifest::load(&root).unwrap();
    let b = &three_sections()[1];
    assert_eq!(stored.sections["b"].content_hash, section_hash(b, &base_spec()));

    let next = Arc::new(RecordingWriter::default());
    let result = run_with(base_spec(), &config, &planner, next.clone()).await;
    assert_eq!(result.outcome, GenerateOutcome::UpToDate);
    assert!(next.calls().is_empty());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn invalid_plan_aborts_before_writing() {
    let root = temp_root("invalid-plan");
    let config = GenerateConfig::new(&root);
    let plan = vec![
        Section::new("a", "A", "a.md", SectionType::Overview, 0),
        Section::new("b", "B", "../escape.md", SectionType::Schemas, 1),
    ];
    let writer = Arc::new(RecordingWriter::default());

    let err = generate_with_index(base_spec(), &config, &FixedPlanner(plan), writer.clone(), &SilentProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, SpecDocsError::Plan { .. }));
    assert!(writer.calls().is_empty());
    assert!(manifest::load(&root).is_none());
    assert!(!root.join("a.md").exists());
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let root = temp_root("concurrency");
    let mut config = GenerateConfig::new(&root);
    config.max_concurrency = 2;
    let plan: Vec<Section> = (0..6)
        .map(|i| Section::new(format!("s{i}"), format!("S{i}"), format!("s{i}.md"), SectionType::Overview, i))
        .collect();
    let writer = Arc::new(SlowWriter::default());

    let result = run_with(base_spec(), &config, &FixedPlanner(plan), writer.clone()).await;

    assert_eq!(result.regenerated, 6);
    assert!(writer.peak.load(Ordering::SeqCst) <= 2);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn fixture_end_to_end_with_builtin_collaborators() {
    let root = temp_root("fixture");
    let config = GenerateConfig::new(&root);

    let result = generate(
        "../../../fixtures/specs/petstore.yaml",
        &config,
        &TagPlanner,
        Arc::new(ReferenceWriter),
        &SilentProgress,
    )
    .await
    .expect("generate");

    assert_eq!(result.outcome, GenerateOutcome::Generated);
    assert!(result.failed.is_empty());
    for rel in [
        "index.md",
        "authentication.md",
        "endpoints/pets.md",
        "endpoints/store.md",
        "schemas.md",
        "errors.md",
    ] {
        assert!(root.join(rel).exists(), "missing {rel}");
    }
    assert!(read(&root, "index.md").starts_with("# Overview\n"));
    assert!(read(&root, "endpoints/pets.md").contains("## GET /pets"));

    std::fs::remove_dir_all(&root).ok();
}
