//! Machine-readable indexes written next to the rendered pages.
//!
//! `llms.txt` lists every section with a one-line description;
//! `llms-full.txt` concatenates every section body.

use std::fmt::Write;

/// File name of the short index.
pub const LLMS_TXT: &str = "llms.txt";

/// File name of the full concatenation.
pub const LLMS_FULL_TXT: &str = "llms-full.txt";

/// Longest description kept in `llms.txt`, in characters.
const MAX_DESCRIPTION_CHARS: usize = 160;

/// A rendered section as the index files see it.
pub struct ArtifactEntry<'a> {
    pub title: &'a str,
    /// Root-relative link to the rendered page.
    pub href: &'a str,
    /// Section source, including its title heading.
    pub body: &'a str,
}

/// Build `llms.txt`: a title, then one link line per section in plan order.
pub fn llms_txt(site_title: &str, entries: &[ArtifactEntry<'_>]) -> String {
    let mut out = format!("# {site_title}\n\n## Sections\n\n");
    for entry in entries {
        match one_line_description(entry.body) {
            Some(description) => {
                let _ = writeln!(out, "- [{}]({}): {description}", entry.title, entry.href);
            }
            None => {
                let _ = writeln!(out, "- [{}]({})", entry.title, entry.href);
            }
        }
    }
    out
}

/// Build `llms-full.txt`: every section body, title heading stripped,
/// each under its own heading and separated by a rule.
pub fn llms_full_txt(site_title: &str, entries: &[ArtifactEntry<'_>]) -> String {
    let mut out = format!("# {site_title}\n");
    for entry in entries {
        let _ = write!(
            out,
            "\n---\n\n# {}\n\nSource: {}\n\n{}\n",
            entry.title,
            entry.href,
            strip_title_heading(entry.body).trim()
        );
    }
    out
}

/// Drop a leading level-one ATX heading from `body`.
pub fn strip_title_heading(body: &str) -> &str {
    let trimmed = body.trim_start();
    if trimmed.starts_with("# ") || trimmed == "#" {
        match trimmed.find('\n') {
            Some(end) => &trimmed[end + 1..],
            None => "",
        }
    } else {
        body
    }
}

/// First prose line of a body, skipping headings, fences, tables and lists.
pub fn one_line_description(body: &str) -> Option<String> {
    let mut in_fence = false;
    for line in strip_title_heading(body).lines() {
        let line = line.trim();
        if line.starts_with("```") || line.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence
            || line.is_empty()
            || line.starts_with('#')
            || line.starts_with('|')
            || line.starts_with("- ")
            || line.starts_with("* ")
            || line.starts_with('>')
        {
            continue;
        }
        return Some(truncate(line));
    }
    None
}

fn truncate(line: &str) -> String {
    if line.chars().count() <= MAX_DESCRIPTION_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(MAX_DESCRIPTION_CHARS - 1).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<ArtifactEntry<'static>> {
        vec![
            ArtifactEntry {
                title: "Overview",
                href: "index.html",
                body: "# Overview\n\nThe Petstore API.\n\n## Servers\n",
            },
            ArtifactEntry {
                title: "Pets",
                href: "endpoints/pets.html",
                body: "# Pets\n\n## GET /pets\n\n```json\n{}\n```\n",
            },
        ]
    }

    #[test]
    fn short_index_lists_sections_in_order() {
        let txt = llms_txt("Petstore", &entries());
        assert!(txt.starts_with("# Petstore\n"));
        let overview = txt.find("- [Overview](index.html): The Petstore API.").unwrap();
        let pets = txt.find("- [Pets](endpoints/pets.html)\n").unwrap();
        assert!(overview < pets);
    }

    #[test]
    fn full_text_strips_section_titles() {
        let txt = llms_full_txt("Petstore", &entries());
        assert_eq!(txt.matches("# Overview").count(), 1);
        assert_eq!(txt.matches("\n---\n").count(), 2);
        assert!(txt.contains("The Petstore API."));
        assert!(txt.contains("## GET /pets"));
    }

    #[test]
    fn strip_title_only_removes_h1() {
        assert_eq!(strip_title_heading("# T\nbody"), "body");
        assert_eq!(strip_title_heading("## Sub\nbody"), "## Sub\nbody");
        assert_eq!(strip_title_heading("# Only"), "");
    }

    #[test]
    fn description_skips_code_and_lists() {
        let body = "# T\n\n```\nnot this\n```\n\n- nor this\n\nBut this line.\n";
        assert_eq!(one_line_description(body).as_deref(), Some("But this line."));
        assert_eq!(one_line_description("# T\n\n## Only headings\n"), None);
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let long = "x".repeat(400);
        let description = one_line_description(&long).unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(description.ends_with('…'));
    }
}
