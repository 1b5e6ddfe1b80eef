//! specdocs CLI: incremental documentation generation for OpenAPI specs.
//!
//! `generate` turns a spec into Markdown sections tracked by a manifest,
//! `build` renders those sections into a static HTML site.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
