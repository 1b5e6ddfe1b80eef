//! Incremental generation run.
//!
//! Hashes every planned section against the spec index, compares with the
//! previous manifest, hands stale sections to the writer concurrently, removes
//! files whose sections left the plan, and records the new state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use specdocs_shared::{
    Manifest, ManifestEntry, Result, RunId, Section, SpecDocsError, WrittenSection,
};
use specdocs_spec::SpecIndex;

use crate::hash;
use crate::manifest;
use crate::planner::Planner;
use crate::writer::{WriteContext, Writer};

/// Default number of writer calls allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

// ---------------------------------------------------------------------------
// Config & result
// ---------------------------------------------------------------------------

/// Configuration for a generation run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Directory receiving section files and the manifest.
    pub output_root: PathBuf,
    /// Free-form guidance passed to the planner and writer.
    pub instructions: Option<String>,
    /// Regenerate every section regardless of stored hashes.
    pub force: bool,
    /// Upper bound on concurrent writer calls.
    pub max_concurrency: usize,
    /// Store the new hash for sections whose writer call failed, instead of
    /// leaving them marked for retry.
    pub refresh_failed_hashes: bool,
}

impl GenerateConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            instructions: None,
            force: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            refresh_failed_hashes: false,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Spec and instructions unchanged; nothing was touched.
    UpToDate,
    /// Every section was cached; only the manifest was rewritten.
    MetadataRefreshed,
    /// At least one section was handed to the writer.
    Generated,
}

/// Result of a generation run.
#[derive(Debug)]
pub struct GenerateResult {
    pub run_id: RunId,
    pub outcome: GenerateOutcome,
    /// Sections in the plan.
    pub planned: usize,
    /// Sections written to disk this run.
    pub regenerated: usize,
    /// Sections skipped because their hash matched.
    pub cached: usize,
    /// Ids of sections whose writer call or file write failed.
    pub failed: Vec<String>,
    /// Files of dropped sections that were deleted.
    pub orphans_removed: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a section file has been written.
    fn section_written(&self, id: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn section_written(&self, _id: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &GenerateResult) {}
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Load the spec at `spec_location` and run generation against it.
pub async fn generate(
    spec_location: &str,
    config: &GenerateConfig,
    planner: &dyn Planner,
    writer: Arc<dyn Writer>,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    progress.phase("Loading spec");
    let index = specdocs_spec::load_spec(spec_location).await?;
    generate_with_index(index, config, planner, writer, progress).await
}

/// Run generation against an already built index.
pub async fn generate_with_index(
    index: SpecIndex,
    config: &GenerateConfig,
    planner: &dyn Planner,
    writer: Arc<dyn Writer>,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let run_id = RunId::new();
    run(run_id, index, config, planner, writer, progress).await
}

/// Ask `planner` for a plan, reject it if it breaks plan invariants, and
/// return it sorted by `order`, then id.
pub async fn plan_sections(
    index: &SpecIndex,
    planner: &dyn Planner,
    instructions: Option<&str>,
) -> Result<Vec<Section>> {
    let mut plan = planner.plan(index, instructions).await?;
    validate_plan(&plan)?;
    sort_plan(&mut plan);
    Ok(plan)
}

/// Order sections the same way [`Manifest::ordered_entries`] does, so the
/// site navigation follows the processing order when `order` values repeat.
fn sort_plan(plan: &mut [Section]) {
    plan.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
}

#[instrument(skip_all, fields(run_id = %run_id, output = %config.output_root.display()))]
async fn run(
    run_id: RunId,
    index: SpecIndex,
    config: &GenerateConfig,
    planner: &dyn Planner,
    writer: Arc<dyn Writer>,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();
    let spec_hash = hash::spec_hash(&index);
    let instructions_hash = hash::instructions_hash(config.instructions.as_deref());

    let previous = manifest::load(&config.output_root);

    if let Some(prev) = &previous {
        let unchanged =
            prev.spec_hash == spec_hash && prev.instructions_hash == instructions_hash;
        if !config.force && unchanged && !has_failed_entries(prev) {
            info!("spec and instructions unchanged, nothing to do");
            let result = GenerateResult {
                run_id,
                outcome: GenerateOutcome::UpToDate,
                planned: prev.sections.len(),
                regenerated: 0,
                cached: prev.sections.len(),
                failed: Vec::new(),
                orphans_removed: 0,
                elapsed: start.elapsed(),
            };
            progress.done(&result);
            return Ok(result);
        }
    }

    let force_all = config.force
        || previous
            .as_ref()
            .is_none_or(|prev| prev.instructions_hash != instructions_hash);

    // --- Plan ---
    progress.phase("Planning sections");
    let plan = plan_sections(&index, planner, config.instructions.as_deref()).await?;
    let hashes: Vec<String> = plan.iter().map(|s| hash::section_hash(s, &index)).collect();

    let stale: Vec<Section> = plan
        .iter()
        .zip(&hashes)
        .filter(|(section, hash)| force_all || !is_cached(previous.as_ref(), section, hash))
        .map(|(section, _)| section.clone())
        .collect();
    let cached = plan.len() - stale.len();

    info!(
        planned = plan.len(),
        stale = stale.len(),
        cached,
        force_all,
        "sections classified"
    );

    // --- Write ---
    let mut failed: Vec<String> = Vec::new();
    let mut regenerated = 0;
    let outcome = if stale.is_empty() {
        GenerateOutcome::MetadataRefreshed
    } else {
        progress.phase("Writing sections");
        let ctx = Arc::new(WriteContext {
            index: Arc::new(index),
            plan: Arc::from(plan.clone()),
            instructions: config.instructions.clone(),
        });
        let total = stale.len();
        let results = write_stale(stale, ctx, writer, config.max_concurrency).await;

        for (section, result) in results {
            let written = result.and_then(|w| persist_section(&config.output_root, &section, &w));
            match written {
                Ok(path) => {
                    regenerated += 1;
                    debug!(section = %section.id, path = %path.display(), "section written");
                    progress.section_written(&section.id, regenerated, total);
                }
                Err(e) => {
                    warn!(section = %section.id, error = %e, "section failed, skipping");
                    failed.push(section.id);
                }
            }
        }
        GenerateOutcome::Generated
    };

    // --- Orphans ---
    progress.phase("Removing orphaned files");
    let orphans_removed = remove_orphans(&config.output_root, previous.as_ref(), &plan);

    // --- Manifest ---
    let failed_ids: HashSet<&str> = failed.iter().map(String::as_str).collect();
    let mut next = Manifest::new(spec_hash, instructions_hash);
    let now = Utc::now();
    for (section, hash) in plan.iter().zip(hashes) {
        let content_hash = if failed_ids.contains(section.id.as_str()) && !config.refresh_failed_hashes {
            String::new()
        } else {
            hash
        };
        next.sections.insert(
            section.id.clone(),
            ManifestEntry {
                content_hash,
                output_path: section.output_path.clone(),
                title: Some(section.title.clone()),
                group: section.group.clone(),
                order: Some(section.order),
                generated_at: now,
            },
        );
    }
    manifest::save(&config.output_root, &next)?;

    let result = GenerateResult {
        run_id,
        outcome,
        planned: plan.len(),
        regenerated,
        cached,
        failed,
        orphans_removed,
        elapsed: start.elapsed(),
    };

    info!(
        outcome = ?result.outcome,
        regenerated = result.regenerated,
        cached = result.cached,
        failed = result.failed.len(),
        orphans_removed = result.orphans_removed,
        elapsed_ms = result.elapsed.as_millis(),
        "generation complete"
    );

    progress.done(&result);
    Ok(result)
}

// ---------------------------------------------------------------------------
// Plan validation
// ---------------------------------------------------------------------------

/// Reject plans with duplicate ids or output paths, or output paths that
/// could escape the output root.
pub fn validate_plan(plan: &[Section]) -> Result<()> {
    if plan.is_empty() {
        return Err(SpecDocsError::plan("planner returned no sections"));
    }

    let mut ids = HashSet::new();
    let mut paths = HashSet::new();
    for section in plan {
        if section.id.trim().is_empty() {
            return Err(SpecDocsError::plan("section with empty id"));
        }
        if !ids.insert(section.id.as_str()) {
            return Err(SpecDocsError::plan(format!("duplicate section id `{}`", section.id)));
        }
        validate_output_path(&section.output_path)?;
        if !paths.insert(section.output_path.as_str()) {
            return Err(SpecDocsError::plan(format!(
                "duplicate output path `{}`",
                section.output_path
            )));
        }
    }
    Ok(())
}

/// A relative, slash-separated path with no `..` segments.
pub fn validate_output_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(SpecDocsError::plan("empty output path"));
    }
    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        return Err(SpecDocsError::plan(format!("output path `{path}` is absolute")));
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(SpecDocsError::plan(format!(
            "output path `{path}` leaves the output root"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn has_failed_entries(manifest: &Manifest) -> bool {
    manifest.sections.values().any(|e| e.content_hash.is_empty())
}

/// A section is cached when the previous run stored the same hash for the
/// same id at the same output path.
fn is_cached(previous: Option<&Manifest>, section: &Section, hash: &str) -> bool {
    previous
        .and_then(|m| m.sections.get(&section.id))
        .is_some_and(|entry| {
            !entry.content_hash.is_empty()
                && entry.content_hash == hash
                && entry.output_path == section.output_path
        })
}

/// Run the writer for every stale section. Tasks are spawned together and
/// all awaited; one failing has no effect on the others.
async fn write_stale(
    sections: Vec<Section>,
    ctx: Arc<WriteContext>,
    writer: Arc<dyn Writer>,
    max_concurrency: usize,
) -> Vec<(Section, Result<WrittenSection>)> {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut handles = Vec::with_capacity(sections.len());

    for section in sections {
        let writer = Arc::clone(&writer);
        let ctx = Arc::clone(&ctx);
        let sem = Arc::clone(&semaphore);
        let task_section = section.clone();

        let handle = tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|e| SpecDocsError::Writer(format!("semaphore closed: {e}")))?;
            writer.write(&task_section, &ctx).await
        });
        handles.push((section, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (section, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(SpecDocsError::Writer(format!("{}: task failed: {e}", section.id))),
        };
        results.push((section, result));
    }
    results
}

/// Write `# title` followed by the body to the section's output path.
fn persist_section(output_root: &Path, section: &Section, written: &WrittenSection) -> Result<PathBuf> {
    let path = output_root.join(&section.output_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SpecDocsError::io(parent, e))?;
    }

    let title = match written.title.trim() {
        "" => section.title.trim(),
        t => t,
    };
    let body = written.body.trim();
    let content = if body.is_empty() {
        format!("# {title}\n")
    } else {
        format!("# {title}\n\n{body}\n")
    };

    std::fs::write(&path, content).map_err(|e| SpecDocsError::io(&path, e))?;
    Ok(path)
}

/// Delete files recorded by the previous run whose paths are not in the
/// current plan. Returns how many were removed.
fn remove_orphans(output_root: &Path, previous: Option<&Manifest>, plan: &[Section]) -> usize {
    let Some(previous) = previous else {
        return 0;
    };
    let current: HashSet<&str> = plan.iter().map(|s| s.output_path.as_str()).collect();

    let mut removed = 0;
    for (id, entry) in &previous.sections {
        if current.contains(entry.output_path.as_str()) {
            continue;
        }
        if let Err(e) = validate_output_path(&entry.output_path) {
            warn!(section = %id, error = %e, "not removing orphan outside output root");
            continue;
        }

        let path = output_root.join(&entry.output_path);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(section = %id, path = %path.display(), "removed orphan");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(section = %id, path = %path.display(), "orphan already absent");
            }
            Err(e) => {
                warn!(section = %id, path = %path.display(), error = %e, "failed to remove orphan");
            }
        }
    }
    removed
}
