//! Markdown to HTML conversion for section pages.
//!
//! Runs pulldown-cmark and rewrites its event stream before handing it to the
//! stock HTML writer:
//! - headings get an `id` equal to the slug of their text
//! - links to section sources point at rendered pages
//! - fenced code goes through the [`Highlighter`], or is escaped verbatim

use std::borrow::Cow;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use specdocs_shared::slugify;

use crate::highlight::Highlighter;
use crate::paths;
use crate::template::escape;

/// Parser options shared with heading extraction so both see the same tree.
pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Result of rendering one section body.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// Text of the first level-one heading, if any.
    pub title: Option<String>,
}

struct HeadingBuffer<'a> {
    level: HeadingLevel,
    text: String,
    events: Vec<Event<'a>>,
}

struct CodeBuffer {
    language: Option<String>,
    code: String,
}

/// Render `markdown` to an HTML fragment.
pub fn render_markdown(markdown: &str, highlighter: &dyn Highlighter) -> RenderedPage {
    let mut events: Vec<Event<'_>> = Vec::new();
    let mut heading: Option<HeadingBuffer<'_>> = None;
    let mut code: Option<CodeBuffer> = None;
    let mut title: Option<String> = None;

    for event in Parser::new_ext(markdown, parser_options()) {
        if code.is_some() {
            match event {
                Event::Text(text) => {
                    if let Some(block) = code.as_mut() {
                        block.code.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(block) = code.take() {
                        events.push(Event::Html(code_block_html(&block, highlighter).into()));
                    }
                }
                _ => {}
            }
            continue;
        }

        let event = match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                code = Some(CodeBuffer {
                    language: code_language(&kind),
                    code: String::new(),
                });
                continue;
            }
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some(HeadingBuffer {
                    level,
                    text: String::new(),
                    events: Vec::new(),
                });
                continue;
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(done) = heading.take() {
                    let text = done.text.trim().to_string();
                    if done.level == HeadingLevel::H1 && title.is_none() {
                        title = Some(text.clone());
                    }
                    events.push(Event::Start(Tag::Heading {
                        level: done.level,
                        id: Some(CowStr::from(slugify(&text))),
                        classes: Vec::new(),
                        attrs: Vec::new(),
                    }));
                    events.extend(done.events);
                    events.push(Event::End(TagEnd::Heading(done.level)));
                }
                continue;
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let rewritten = match paths::rewrite_link(&dest_url) {
                    Cow::Owned(rewritten) => Some(rewritten),
                    Cow::Borrowed(_) => None,
                };
                let dest_url = rewritten.map(CowStr::from).unwrap_or(dest_url);
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                })
            }
            other => other,
        };

        match heading.as_mut() {
            Some(buf) => {
                if let Event::Text(text) | Event::Code(text) = &event {
                    buf.text.push_str(text);
                }
                buf.events.push(event);
            }
            None => events.push(event),
        }
    }

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    RenderedPage { html, title }
}

fn code_language(kind: &CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
        CodeBlockKind::Indented => None,
    }
}

fn code_block_html(block: &CodeBuffer, highlighter: &dyn Highlighter) -> String {
    let body = block
        .language
        .as_deref()
        .and_then(|lang| highlighter.highlight(&block.code, lang))
        .unwrap_or_else(|| escape(&block.code));
    match &block.language {
        Some(lang) => format!(
            "<pre><code class=\"language-{}\">{body}</code></pre>\n",
            escape(lang)
        ),
        None => format!("<pre><code>{body}</code></pre>\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::ClassHighlighter;
    use crate::toc::extract_headings;

    fn render(md: &str) -> RenderedPage {
        render_markdown(md, &ClassHighlighter::new())
    }

    #[test]
    fn heading_ids_match_extracted_slugs() {
        let md = "# Pets\n\n## GET /pets/{petId}\n\n### The `limit` query\n\n## What's new?\n";
        let page = render(md);
        for heading in extract_headings(md) {
            assert!(
                page.html.contains(&format!("id=\"{}\"", heading.slug)),
                "missing id {} in {}",
                heading.slug,
                page.html
            );
        }
        assert!(page.html.contains("<h2 id=\"get-petspetid\">GET /pets/{petId}</h2>"));
        assert!(page.html.contains("<h3 id=\"the-limit-query\">The <code>limit</code> query</h3>"));
    }

    #[test]
    fn first_h1_is_title() {
        let page = render("# Pets\n\ntext\n\n# Other\n");
        assert_eq!(page.title.as_deref(), Some("Pets"));
    }

    #[test]
    fn source_links_are_rewritten() {
        let page = render("See [schemas](../schemas.md#pet) and [site](https://x.dev/a.md).\n");
        assert!(page.html.contains("href=\"../schemas.html#pet\""));
        assert!(page.html.contains("href=\"https://x.dev/a.md\""));
    }

    #[test]
    fn known_language_is_highlighted() {
        let page = render("```json\n{\"a\": 1}\n```\n");
        assert!(page.html.contains("<pre><code class=\"language-json\">"));
        assert!(page.html.contains("hl-number"));
    }

    #[test]
    fn unknown_language_falls_back_to_escaped_text() {
        let page = render("```cobol\nIF A < B\n```\n");
        assert!(page.html.contains("<code class=\"language-cobol\">IF A &lt; B\n</code>"));
        assert!(!page.html.contains("<span"));
    }

    #[test]
    fn indented_code_is_escaped() {
        let page = render("para\n\n    <tag>\n");
        assert!(page.html.contains("<pre><code>&lt;tag&gt;\n</code></pre>"));
    }

    #[test]
    fn tables_render() {
        let page = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(page.html.contains("<table>"));
    }
}
