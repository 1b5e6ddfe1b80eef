//! URL-safe slugs for headings and file names.

use std::sync::LazyLock;

use regex::Regex;

static STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static HYPHEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

/// Derive an anchor slug from heading text.
///
/// Lower-cases, drops anything that is not a word character, whitespace or
/// hyphen, turns whitespace runs into a single hyphen, collapses repeated
/// hyphens and trims hyphens from both ends.
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = STRIP_RE.replace_all(&lower, "");
    let spaced = SPACE_RE.replace_all(stripped.trim(), "-");
    let collapsed = HYPHEN_RE.replace_all(&spaced, "-");
    collapsed.trim_matches('-').to_string()
}
