//! Page paths and page-relative links.

use std::borrow::Cow;

/// Extension of section source files.
pub const SOURCE_EXT: &str = ".md";

/// Extension of rendered pages.
pub const PAGE_EXT: &str = ".html";

/// Rendered page path for a section output path (`a/b.md` -> `a/b.html`).
pub fn page_path(output_path: &str) -> String {
    match output_path.strip_suffix(SOURCE_EXT) {
        Some(stem) => format!("{stem}{PAGE_EXT}"),
        None => format!("{output_path}{PAGE_EXT}"),
    }
}

/// Number of directories between the site root and the page.
pub fn depth(output_path: &str) -> usize {
    output_path.split('/').count().saturating_sub(1)
}

/// Prefix that turns a root-relative href into a page-relative one.
pub fn relative_prefix(output_path: &str) -> String {
    match depth(output_path) {
        0 => "./".to_string(),
        n => "../".repeat(n),
    }
}

/// Point links at section sources to the rendered pages instead, keeping
/// any query or fragment. External and non-source links are left alone.
pub fn rewrite_link(dest: &str) -> Cow<'_, str> {
    if dest.contains("://") || dest.starts_with("mailto:") || dest.starts_with('#') {
        return Cow::Borrowed(dest);
    }

    let split_at = dest.find(['?', '#']).unwrap_or(dest.len());
    let (path, suffix) = dest.split_at(split_at);
    match path.strip_suffix(SOURCE_EXT) {
        Some(stem) => Cow::Owned(format!("{stem}{PAGE_EXT}{suffix}")),
        None => Cow::Borrowed(dest),
    }
}
