//! Shared types, error model, and configuration for specdocs.
//!
//! This crate is the foundation depended on by all other specdocs crates.
//! It provides:
//! - [`SpecDocsError`], the unified error type
//! - Domain types ([`Section`], [`Manifest`], [`NavEntry`], [`Heading`], [`RunId`])
//! - Configuration ([`AppConfig`], [`SiteConfig`], config loading)
//! - [`slugify`] for heading anchors and file names

pub mod config;
pub mod error;
pub mod slug;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GenerationConfig, SITE_CONFIG_FILE_NAME, SiteConfig,
    SiteDefaultsConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, load_site_config,
};
pub use error::{Result, SpecDocsError};
pub use slug::slugify;
pub use types::{
    Heading, MANIFEST_VERSION, Manifest, ManifestEntry, NavEntry, NavItem, RunId, Section,
    SectionType, WrittenSection,
};
