//! Code block highlighting.
//!
//! A highlighter is built once per site build and shared by every code block
//! on every page; it is released when the build returns.

use std::collections::HashMap;

use regex::Regex;

use crate::template::escape;

/// Turns source code into an HTML fragment.
pub trait Highlighter {
    /// Highlighted HTML for `code`, or `None` when `language` is not
    /// recognized. Callers fall back to escaped plain text.
    fn highlight(&self, code: &str, language: &str) -> Option<String>;
}

/// Token classes a grammar can emit, in match priority order.
const TOKEN_CLASSES: [&str; 7] = [
    "comment", "key", "string", "number", "literal", "keyword", "variable",
];

/// Regex-based highlighter wrapping tokens in `<span class="hl-…">`.
pub struct ClassHighlighter {
    grammars: HashMap<&'static str, Regex>,
}

impl ClassHighlighter {
    /// Compile the grammars for every supported language.
    pub fn new() -> Self {
        let mut grammars = HashMap::new();
        for (name, pattern) in GRAMMARS {
            if let Ok(re) = Regex::new(pattern) {
                grammars.insert(*name, re);
            }
        }
        Self { grammars }
    }

    fn grammar(&self, language: &str) -> Option<&Regex> {
        let lang = language.to_ascii_lowercase();
        let canonical = match lang.as_str() {
            "yml" => "yaml",
            "sh" | "shell" | "console" | "zsh" => "bash",
            other => other,
        };
        self.grammars.get(canonical)
    }
}

impl Default for ClassHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for ClassHighlighter {
    fn highlight(&self, code: &str, language: &str) -> Option<String> {
        let grammar = self.grammar(language)?;
        let mut out = String::with_capacity(code.len() + code.len() / 2);
        let mut last = 0;

        for caps in grammar.captures_iter(code) {
            let Some(class) = TOKEN_CLASSES.iter().find(|c| caps.name(c).is_some()) else {
                continue;
            };
            let Some(token) = caps.name(class) else {
                continue;
            };
            out.push_str(&escape(&code[last..token.start()]));
            out.push_str("<span class=\"hl-");
            out.push_str(class);
            out.push_str("\">");
            out.push_str(&escape(token.as_str()));
            out.push_str("</span>");
            last = token.end();
        }
        out.push_str(&escape(&code[last..]));
        Some(out)
    }
}

const GRAMMARS: &[(&str, &str)] = &[
    (
        "json",
        r#"(?P<key>"(?:[^"\\]|\\.)*"\s*:)|(?P<string>"(?:[^"\\]|\\.)*")|(?P<number>-?\b\d+(?:\.\d+)?(?:[eE][+-]?\d+)?\b)|\b(?P<literal>true|false|null)\b"#,
    ),
    (
        "yaml",
        r#"(?m)(?P<comment>#.*$)|(?P<key>^[ \t]*(?:- )?[\w.$/-]+:)|(?P<string>"(?:[^"\\]|\\.)*"|'[^']*')|\b(?P<literal>true|false|null)\b|(?P<number>-?\b\d+(?:\.\d+)?\b)"#,
    ),
    (
        "bash",
        r#"(?m)(?P<comment>(?:^|\s)#.*$)|(?P<string>"(?:[^"\\]|\\.)*"|'[^']*')|(?P<variable>\$\{?\w+\}?)|\b(?P<keyword>if|then|else|elif|fi|for|in|do|done|while|case|esac|export|function|return)\b"#,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_tokens_are_classed() {
        let hl = ClassHighlighter::new();
        let html = hl.highlight(r#"{"id": 1, "ok": true, "name": "a<b"}"#, "json").unwrap();
        assert!(html.contains(r#"<span class="hl-key">&quot;id&quot;:</span>"#));
        assert!(html.contains(r#"<span class="hl-number">1</span>"#));
        assert!(html.contains(r#"<span class="hl-literal">true</span>"#));
        assert!(html.contains(r#"<span class="hl-string">&quot;a&lt;b&quot;</span>"#));
    }

    #[test]
    fn yaml_alias_and_comments() {
        let hl = ClassHighlighter::new();
        let html = hl.highlight("# note\nname: pet\n", "YML").unwrap();
        assert!(html.contains(r#"<span class="hl-comment"># note</span>"#));
        assert!(html.contains(r#"<span class="hl-key">name:</span>"#));
    }

    #[test]
    fn bash_variables() {
        let hl = ClassHighlighter::new();
        let html = hl.highlight("curl -H \"Authorization: $TOKEN\" $URL", "sh").unwrap();
        assert!(html.contains(r#"<span class="hl-variable">$URL</span>"#));
    }

    #[test]
    fn unknown_language_is_none() {
        let hl = ClassHighlighter::new();
        assert!(hl.highlight("fn main() {}", "brainfuck").is_none());
    }

    #[test]
    fn all_grammars_compile() {
        assert_eq!(ClassHighlighter::new().grammars.len(), GRAMMARS.len());
    }

    #[test]
    fn text_between_tokens_is_escaped() {
        let hl = ClassHighlighter::new();
        let html = hl.highlight("[1, 2] <>", "json").unwrap();
        assert!(html.ends_with(" &lt;&gt;"));
    }
}
