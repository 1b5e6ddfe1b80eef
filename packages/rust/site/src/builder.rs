//! Static site build: one HTML page per manifest section plus shared assets.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use specdocs_core::{manifest, validate_output_path};
use specdocs_shared::{Manifest, Result, SpecDocsError, load_site_config};

use crate::artifacts::{self, ArtifactEntry};
use crate::highlight::ClassHighlighter;
use crate::nav::{NavSource, build_nav};
use crate::paths;
use crate::render::render_markdown;
use crate::template::{self, PageData};
use crate::toc::{extract_headings, title_from_path};

/// Title used when neither `site.json` nor the caller provides one.
pub const DEFAULT_SITE_TITLE: &str = "API Documentation";

/// Configuration for a site build.
#[derive(Debug, Clone)]
pub struct SiteBuildConfig {
    /// Generated output root holding the manifest and section sources.
    pub source_root: PathBuf,
    /// Directory receiving the rendered site.
    pub site_root: PathBuf,
    /// Title used when `site.json` sets none.
    pub default_title: String,
}

impl SiteBuildConfig {
    pub fn new(source_root: impl Into<PathBuf>, site_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            site_root: site_root.into(),
            default_title: DEFAULT_SITE_TITLE.to_string(),
        }
    }
}

/// Result of a site build.
#[derive(Debug)]
pub struct SiteBuildResult {
    pub site_root: PathBuf,
    pub pages_rendered: usize,
    /// Ids of manifest sections whose source file was missing.
    pub skipped: Vec<String>,
    pub elapsed: Duration,
}

/// A manifest section with its source text loaded.
struct SitePage {
    id: String,
    title: String,
    output_path: String,
    group: Option<String>,
    body: String,
}

/// Render the site for the sections recorded in the source root's manifest.
#[instrument(skip_all, fields(source = %config.source_root.display(), site = %config.site_root.display()))]
pub fn build_site(config: &SiteBuildConfig) -> Result<SiteBuildResult> {
    let start = Instant::now();

    let manifest = manifest::load(&config.source_root).ok_or_else(|| {
        SpecDocsError::Render(format!(
            "no manifest in {}; run `specdocs generate` first",
            config.source_root.display()
        ))
    })?;
    let site = load_site_config(&config.source_root)?;
    let site_title = site.title.clone().unwrap_or_else(|| config.default_title.clone());

    let icon = match &site.icon {
        Some(icon) => Some(resolve_icon(&config.source_root, icon)?),
        None => None,
    };

    let (pages, skipped) = load_pages(&config.source_root, &manifest)?;
    info!(pages = pages.len(), skipped = skipped.len(), "building site");

    create_dir(&config.site_root)?;

    let icon_name = match &icon {
        Some(path) => Some(copy_icon(path, &config.site_root)?),
        None => None,
    };

    let nav_sources: Vec<NavSource> = pages
        .iter()
        .map(|p| NavSource {
            id: p.id.clone(),
            title: p.title.clone(),
            output_path: p.output_path.clone(),
            group: p.group.clone(),
        })
        .collect();
    let home = pages
        .first()
        .map(|p| paths::page_path(&p.output_path))
        .unwrap_or_else(|| "index.html".to_string());

    {
        // One highlighter for the whole pass, dropped when the block exits.
        let highlighter = ClassHighlighter::new();
        for page in &pages {
            let prefix = paths::relative_prefix(&page.output_path);
            let headings = extract_headings(&page.body);
            let navigation = build_nav(&nav_sources, &page.id, &headings, &prefix);
            let rendered = render_markdown(&page.body, &highlighter);

            let css_href = format!("{prefix}{}", template::STYLESHEET_FILE_NAME);
            let home_href = format!("{prefix}{home}");
            let icon_href = icon_name.as_ref().map(|name| format!("{prefix}{name}"));

            let html = template::render_page(&PageData {
                title: &page.title,
                site_title: &site_title,
                html_content: &rendered.html,
                navigation: &navigation,
                css_href: &css_href,
                home_href: &home_href,
                icon_href: icon_href.as_deref(),
            });

            let page_file = config.site_root.join(paths::page_path(&page.output_path));
            write_file(&page_file, &html)?;
            write_file(&config.site_root.join(&page.output_path), &page.body)?;
            debug!(section = %page.id, path = %page_file.display(), "rendered page");
        }
    }

    write_file(
        &config.site_root.join(template::STYLESHEET_FILE_NAME),
        template::STYLESHEET,
    )?;

    let hrefs: Vec<String> = pages.iter().map(|p| paths::page_path(&p.output_path)).collect();
    let entries: Vec<ArtifactEntry<'_>> = pages
        .iter()
        .zip(&hrefs)
        .map(|(p, href)| ArtifactEntry {
            title: &p.title,
            href,
            body: &p.body,
        })
        .collect();
    write_file(
        &config.site_root.join(artifacts::LLMS_TXT),
        &artifacts::llms_txt(&site_title, &entries),
    )?;
    write_file(
        &config.site_root.join(artifacts::LLMS_FULL_TXT),
        &artifacts::llms_full_txt(&site_title, &entries),
    )?;

    let result = SiteBuildResult {
        site_root: config.site_root.clone(),
        pages_rendered: pages.len(),
        skipped,
        elapsed: start.elapsed(),
    };
    info!(
        pages = result.pages_rendered,
        skipped = result.skipped.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "site build complete"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read each manifest section's source in plan order. Sections whose file
/// is missing are reported and left out.
fn load_pages(source_root: &Path, manifest: &Manifest) -> Result<(Vec<SitePage>, Vec<String>)> {
    let mut pages = Vec::new();
    let mut skipped = Vec::new();

    for (id, entry) in manifest.ordered_entries() {
        if let Err(e) = validate_output_path(&entry.output_path) {
            warn!(section = %id, error = %e, "skipping section with unsafe path");
            skipped.push(id.to_string());
            continue;
        }

        let path = source_root.join(&entry.output_path);
        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(section = %id, path = %path.display(), "section source missing, skipping");
                skipped.push(id.to_string());
                continue;
            }
            Err(e) => return Err(SpecDocsError::io(&path, e)),
        };

        let title = entry
            .title
            .clone()
            .or_else(|| first_heading(&body))
            .unwrap_or_else(|| title_from_path(&entry.output_path));

        pages.push(SitePage {
            id: id.to_string(),
            title,
            output_path: entry.output_path.clone(),
            group: entry.group.clone(),
            body,
        });
    }

    Ok((pages, skipped))
}

/// Text of the first `# ` line.
fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn resolve_icon(source_root: &Path, icon: &Path) -> Result<PathBuf> {
    let path = if icon.is_absolute() {
        icon.to_path_buf()
    } else {
        source_root.join(icon)
    };
    if !path.is_file() {
        return Err(SpecDocsError::config(format!(
            "configured icon not found: {}",
            path.display()
        )));
    }
    Ok(path)
}

/// Copy the icon to the site root, returning its file name there.
fn copy_icon(icon: &Path, site_root: &Path) -> Result<String> {
    let name = icon
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SpecDocsError::config(format!("invalid icon path: {}", icon.display())))?
        .to_string();
    let dest = site_root.join(&name);
    std::fs::copy(icon, &dest).map_err(|e| SpecDocsError::io(&dest, e))?;
    debug!(path = %dest.display(), "copied icon");
    Ok(name)
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| SpecDocsError::io(path, e))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    std::fs::write(path, content).map_err(|e| SpecDocsError::io(path, e))
}
