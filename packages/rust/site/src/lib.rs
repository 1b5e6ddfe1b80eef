//! Static site rendering for generated specdocs sections.
//!
//! Reads the manifest and section sources from a generated output root and
//! writes one HTML page per section, a shared stylesheet, copies of the
//! sources and the `llms.txt` / `llms-full.txt` indexes.

pub mod artifacts;
pub mod builder;
pub mod highlight;
pub mod nav;
pub mod paths;
pub mod render;
pub mod template;
pub mod toc;

pub use builder::{DEFAULT_SITE_TITLE, SiteBuildConfig, SiteBuildResult, build_site};
pub use highlight::{ClassHighlighter, Highlighter};
pub use nav::{NavSource, build_nav};
pub use render::{RenderedPage, render_markdown};
pub use toc::extract_headings;
