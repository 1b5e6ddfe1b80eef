//! Heading extraction for per-page tables of contents.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

use specdocs_shared::{Heading, slugify};

use crate::render::parser_options;

/// Second and third level headings of `markdown`, in document order.
///
/// Slugs are derived from the heading's text and inline code, the same input
/// the renderer uses for heading ids.
pub fn extract_headings(markdown: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut current: Option<(u8, String)> = None;

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((heading_level(level), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    if (2..=3).contains(&level) {
                        let text = text.trim().to_string();
                        let slug = slugify(&text);
                        headings.push(Heading { level, text, slug });
                    }
                }
            }
            _ => {}
        }
    }
    headings
}

pub(crate) fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Human-readable title from an output path, for entries stored without one.
pub fn title_from_path(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    let stem = file.strip_suffix(".md").unwrap_or(file);

    if stem == "index" {
        return "Overview".to_string();
    }

    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
