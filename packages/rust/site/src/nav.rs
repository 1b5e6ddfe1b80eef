//! Navigation tree for one rendered page.

use std::collections::HashMap;

use specdocs_shared::{Heading, NavEntry, NavItem};

use crate::paths;

/// A section as the navigation sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavSource {
    pub id: String,
    pub title: String,
    pub output_path: String,
    pub group: Option<String>,
}

/// Build the navigation for the page of section `current_id`.
///
/// Sections are visited in plan order. Ungrouped sections become top-level
/// items where they occur. A group is placed where its label first occurs,
/// and every later section with that label joins that same group.
///
/// Only the current page's item is marked active and carries `toc`.
/// Hrefs are prefixed with `prefix`, the page-relative path to the site root.
pub fn build_nav(
    sections: &[NavSource],
    current_id: &str,
    toc: &[Heading],
    prefix: &str,
) -> Vec<NavEntry> {
    let mut entries: Vec<NavEntry> = Vec::new();
    let mut group_positions: HashMap<&str, usize> = HashMap::new();

    for section in sections {
        let active = section.id == current_id;
        let item = NavItem {
            title: section.title.clone(),
            href: format!("{prefix}{}", paths::page_path(&section.output_path)),
            active,
            toc: active.then(|| toc.to_vec()),
        };

        let Some(label) = section.group.as_deref() else {
            entries.push(NavEntry::Item(item));
            continue;
        };

        match group_positions.get(label) {
            Some(&position) => {
                if let Some(NavEntry::Group { items, .. }) = entries.get_mut(position) {
                    items.push(item);
                }
            }
            None => {
                group_positions.insert(label, entries.len());
                entries.push(NavEntry::Group {
                    label: label.to_string(),
                    items: vec![item],
                });
            }
        }
    }

    entries
}
