//! Application configuration for specdocs.
//!
//! User config lives at `~/.specdocs/specdocs.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! The per-site branding sidecar (`site.json`) is loaded separately by
//! [`load_site_config`] from the generated output root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecDocsError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "specdocs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".specdocs";

/// File name of the branding sidecar inside the output root.
pub const SITE_CONFIG_FILE_NAME: &str = "site.json";

// ---------------------------------------------------------------------------
// Config structs (matching specdocs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Planner/writer collaborator settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Static site settings.
    #[serde(default)]
    pub site: SiteDefaultsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory generated section files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory the static site is rendered into.
    #[serde(default = "default_site_dir")]
    pub site_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            site_dir: default_site_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "docs".into()
}
fn default_site_dir() -> String {
    "site".into()
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// External planner command. Empty means the built-in tag planner.
    #[serde(default)]
    pub planner_cmd: Vec<String>,

    /// External writer command. Empty means the built-in reference writer.
    #[serde(default)]
    pub writer_cmd: Vec<String>,

    /// Maximum writer invocations running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Store the new hash for sections whose writer failed.
    #[serde(default)]
    pub refresh_failed_hashes: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            planner_cmd: Vec::new(),
            writer_cmd: Vec::new(),
            max_concurrency: default_max_concurrency(),
            refresh_failed_hashes: false,
        }
    }
}

fn default_max_concurrency() -> usize {
    8
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteDefaultsConfig {
    /// Site title used when neither the sidecar nor the spec provides one.
    #[serde(default = "default_site_title")]
    pub default_title: String,
}

impl Default for SiteDefaultsConfig {
    fn default() -> Self {
        Self {
            default_title: default_site_title(),
        }
    }
}

fn default_site_title() -> String {
    "API Documentation".into()
}

// ---------------------------------------------------------------------------
// Site sidecar
// ---------------------------------------------------------------------------

/// Branding sidecar read by the site renderer (`site.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title shown in the page header and index artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Icon file, relative to the output root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
}

/// Load the branding sidecar from an output root. Absent file means defaults.
pub fn load_site_config(output_root: &Path) -> Result<SiteConfig> {
    let path = output_root.join(SITE_CONFIG_FILE_NAME);
    if !path.exists() {
        tracing::debug!(?path, "site config not found, using defaults");
        return Ok(SiteConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| SpecDocsError::io(&path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        SpecDocsError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.specdocs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SpecDocsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.specdocs/specdocs.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SpecDocsError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SpecDocsError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SpecDocsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SpecDocsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SpecDocsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
