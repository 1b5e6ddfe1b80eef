//! Persisted build state.
//!
//! The manifest lives at `.specdocs/manifest.json` inside the output root and
//! is rewritten in full at the end of every run that changes anything.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use specdocs_shared::{Manifest, Result, SpecDocsError};

/// Directory inside the output root holding build state.
pub const STATE_DIR: &str = ".specdocs";

/// File name of the manifest inside [`STATE_DIR`].
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Location of the manifest for an output root.
pub fn manifest_path(output_root: &Path) -> PathBuf {
    output_root.join(STATE_DIR).join(MANIFEST_FILE_NAME)
}

/// Load the manifest, or `None` when it is missing or unreadable.
///
/// A corrupt manifest is treated as no prior state; the caller then
/// regenerates everything.
pub fn load(output_root: &Path) -> Option<Manifest> {
    let path = manifest_path(output_root);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no manifest");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read manifest, ignoring");
            return None;
        }
    };

    match serde_json::from_str::<Manifest>(&content) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt manifest, ignoring");
            None
        }
    }
}

/// Replace the manifest with `manifest`, pretty-printed.
pub fn save(output_root: &Path, manifest: &Manifest) -> Result<()> {
    let path = manifest_path(output_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SpecDocsError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(manifest).map_err(|e| {
        SpecDocsError::validation(format!("manifest serialization failed: {e}"))
    })?;
    std::fs::write(&path, json).map_err(|e| SpecDocsError::io(&path, e))?;
    debug!(path = %path.display(), sections = manifest.sections.len(), "wrote manifest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use specdocs_shared::ManifestEntry;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("specdocs-manifest-{}", uuid::Uuid::now_v7()))
    }

    #[test]
    fn missing_manifest_is_none() {
        let root = temp_root();
        assert!(load(&root).is_none());
    }

    #[test]
    fn corrupt_manifest_is_none() {
        let root = temp_root();
        let path = manifest_path(&root);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(load(&root).is_none());
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn save_then_load() {
        let root = temp_root();
        let mut manifest = Manifest::new("spec", "");
        manifest.sections.insert(
            "overview".into(),
            ManifestEntry {
                content_hash: "abc".into(),
                output_path: "index.md".into(),
                title: Some("Overview".into()),
                group: None,
                order: Some(0),
                generated_at: Utc::now(),
            },
        );

        save(&root, &manifest).unwrap();
        assert_eq!(load(&root), Some(manifest));

        // A second save fully replaces the first.
        let empty = Manifest::new("spec2", "");
        save(&root, &empty).unwrap();
        assert_eq!(load(&root), Some(empty));

        std::fs::remove_dir_all(&root).ok();
    }
}
