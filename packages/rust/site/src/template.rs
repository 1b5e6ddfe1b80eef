//! Static HTML page template and stylesheet.

use std::fmt::Write;

use specdocs_shared::{Heading, NavEntry, NavItem};

/// File name of the shared stylesheet at the site root.
pub const STYLESHEET_FILE_NAME: &str = "style.css";

/// All data needed to render one page.
pub struct PageData<'a> {
    pub title: &'a str,
    pub site_title: &'a str,
    pub html_content: &'a str,
    pub navigation: &'a [NavEntry],
    /// Page-relative href of the stylesheet.
    pub css_href: &'a str,
    /// Page-relative href of the first page.
    pub home_href: &'a str,
    pub icon_href: Option<&'a str>,
}

/// Render a complete static HTML page.
pub fn render_page(page: &PageData<'_>) -> String {
    let mut html = String::with_capacity(8192 + page.html_content.len());

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(
        html,
        "<title>{} | {}</title>",
        escape(page.title),
        escape(page.site_title)
    );
    let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{}\">", escape(page.css_href));
    if let Some(icon) = page.icon_href {
        let _ = writeln!(html, "<link rel=\"icon\" href=\"{}\">", escape(icon));
    }
    html.push_str("</head>\n<body>\n<div class=\"layout\">\n");

    render_sidebar(&mut html, page);

    html.push_str("<main class=\"content\">\n<article>\n");
    html.push_str(page.html_content);
    html.push_str("\n</article>\n</main>\n");

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, page: &PageData<'_>) {
    html.push_str("<aside class=\"sidebar\">\n");
    let _ = write!(html, "<a class=\"brand\" href=\"{}\">", escape(page.home_href));
    if let Some(icon) = page.icon_href {
        let _ = write!(html, "<img src=\"{}\" alt=\"\">", escape(icon));
    }
    let _ = writeln!(html, "<span>{}</span></a>", escape(page.site_title));

    html.push_str("<nav>\n<ul class=\"nav\">\n");
    for entry in page.navigation {
        match entry {
            NavEntry::Item(item) => render_nav_item(html, item),
            NavEntry::Group { label, items } => {
                html.push_str("<li class=\"nav-group\">\n");
                let _ = writeln!(html, "<span class=\"nav-group-label\">{}</span>", escape(label));
                html.push_str("<ul>\n");
                for item in items {
                    render_nav_item(html, item);
                }
                html.push_str("</ul>\n</li>\n");
            }
        }
    }
    html.push_str("</ul>\n</nav>\n</aside>\n");
}

fn render_nav_item(html: &mut String, item: &NavItem) {
    let class = if item.active { " class=\"active\"" } else { "" };
    let _ = writeln!(
        html,
        "<li{class}><a href=\"{}\">{}</a>",
        escape(&item.href),
        escape(&item.title)
    );
    if let Some(toc) = item.toc.as_deref().filter(|t| !t.is_empty()) {
        render_toc(html, toc);
    }
    html.push_str("</li>\n");
}

fn render_toc(html: &mut String, toc: &[Heading]) {
    html.push_str("<ul class=\"toc\">\n");
    for heading in toc {
        let indent = if heading.level >= 3 { " class=\"toc-sub\"" } else { "" };
        let _ = writeln!(
            html,
            "<li{indent}><a href=\"#{}\">{}</a></li>",
            escape(&heading.slug),
            escape(&heading.text)
        );
    }
    html.push_str("</ul>\n");
}

/// Escape HTML special characters.
pub(crate) fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Shared stylesheet written once per site.
pub const STYLESHEET: &str = r#"*, *::before, *::after { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, -apple-system, "Segoe UI", sans-serif; color: #1f2933; line-height: 1.6; }
.layout { display: flex; min-height: 100vh; }
.sidebar { width: 280px; flex-shrink: 0; border-right: 1px solid #e4e7eb; padding: 1.5rem 1rem; position: sticky; top: 0; height: 100vh; overflow-y: auto; }
.brand { display: flex; align-items: center; gap: 0.5rem; margin-bottom: 1.25rem; font-weight: 600; font-size: 1.1rem; color: inherit; text-decoration: none; }
.brand img { width: 28px; height: 28px; }
.nav, .nav ul { list-style: none; margin: 0; padding: 0; }
.nav a { display: block; padding: 0.3rem 0.4rem; border-radius: 4px; color: #3e4c59; text-decoration: none; font-size: 0.92rem; }
.nav a:hover { color: #1f2933; background: #f5f7fa; }
.nav li.active > a { color: #1d4ed8; font-weight: 600; }
.nav-group { margin-top: 0.75rem; }
.nav-group > ul { margin-left: 0.5rem; }
.nav-group-label { display: block; padding: 0.3rem 0.4rem; font-size: 0.75rem; font-weight: 600; text-transform: uppercase; letter-spacing: 0.05em; color: #7b8794; }
.toc { margin: 0.25rem 0 0.5rem 0.75rem !important; border-left: 1px solid #e4e7eb; }
.toc a { font-size: 0.85rem; color: #616e7c; }
.toc .toc-sub a { padding-left: 1.2rem; }
.content { flex: 1; min-width: 0; padding: 2rem 3rem 4rem; max-width: 60rem; }
.content pre { background: #f5f7fa; padding: 1rem; border-radius: 6px; overflow-x: auto; font-size: 0.875rem; }
.content code { font-family: ui-monospace, SFMono-Regular, Menlo, monospace; }
.content table { border-collapse: collapse; margin: 1rem 0; }
.content th, .content td { border: 1px solid #e4e7eb; padding: 0.4rem 0.75rem; text-align: left; }
.hl-key { color: #1d4ed8; }
.hl-string { color: #047857; }
.hl-number, .hl-literal { color: #b45309; }
.hl-comment { color: #7b8794; font-style: italic; }
.hl-keyword { color: #7c3aed; }
.hl-variable { color: #be185d; }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn page<'a>(nav: &'a [NavEntry], css: &'a str) -> PageData<'a> {
        PageData {
            title: "Pets",
            site_title: "Petstore",
            html_content: "<p>Hello</p>",
            navigation: nav,
            css_href: css,
            home_href: "./index.html",
            icon_href: None,
        }
    }

    #[test]
    fn page_contains_content_and_stylesheet() {
        let html = render_page(&page(&[], "../style.css"));
        assert!(html.contains("<p>Hello</p>"));
        assert!(html.contains("<title>Pets | Petstore</title>"));
        assert!(html.contains("href=\"../style.css\""));
        assert!(!html.contains("rel=\"icon\""));
    }

    #[test]
    fn active_item_shows_toc() {
        let nav = vec![
            NavEntry::Item(NavItem {
                title: "Overview".into(),
                href: "./index.html".into(),
                active: false,
                toc: None,
            }),
            NavEntry::Group {
                label: "Endpoints".into(),
                items: vec![NavItem {
                    title: "Pets".into(),
                    href: "./endpoints/pets.html".into(),
                    active: true,
                    toc: Some(vec![
                        Heading { level: 2, text: "GET /pets".into(), slug: "get-pets".into() },
                        Heading { level: 3, text: "Responses".into(), slug: "responses".into() },
                    ]),
                }],
            },
        ];
        let html = render_page(&page(&nav, "./style.css"));
        assert!(html.contains("<span class=\"nav-group-label\">Endpoints</span>"));
        assert!(html.contains("<li class=\"active\"><a href=\"./endpoints/pets.html\">Pets</a>"));
        assert!(html.contains("<li><a href=\"#get-pets\">GET /pets</a></li>"));
        assert!(html.contains("<li class=\"toc-sub\"><a href=\"#responses\">Responses</a></li>"));
        assert_eq!(html.matches("class=\"toc\"").count(), 1);
    }

    #[test]
    fn icon_is_linked() {
        let mut data = page(&[], "./style.css");
        data.icon_href = Some("./icon.png");
        let html = render_page(&data);
        assert!(html.contains("<link rel=\"icon\" href=\"./icon.png\">"));
        assert!(html.contains("<img src=\"./icon.png\""));
    }

    #[test]
    fn escape_special_characters() {
        assert_eq!(escape("<script>"), "&lt;script&gt;");
        assert_eq!(escape("a&b"), "a&amp;b");
        assert_eq!(escape("\"hello\""), "&quot;hello&quot;");
    }
}
