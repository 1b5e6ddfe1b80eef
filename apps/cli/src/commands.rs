//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use specdocs_core::{
    CommandPlanner, CommandWriter, GenerateConfig, GenerateOutcome, GenerateResult, Planner,
    ProgressReporter, ReferenceWriter, TagPlanner, Writer, plan_sections,
};
use specdocs_shared::{AppConfig, init_config, load_config};
use specdocs_site::{SiteBuildConfig, build_site};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// specdocs: OpenAPI specs to incrementally maintained Markdown and HTML docs.
#[derive(Parser)]
#[command(
    name = "specdocs",
    version,
    about = "Generate and incrementally refresh documentation for OpenAPI specs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate (or refresh) Markdown sections for a spec.
    Generate(GenerateArgs),

    /// Render generated sections into a static HTML site.
    Build {
        /// Generated output directory (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Site directory (defaults to `defaults.site_dir`).
        #[arg(short, long)]
        site: Option<PathBuf>,

        /// Site title when `site.json` sets none.
        #[arg(long)]
        title: Option<String>,
    },

    /// Print the section plan for a spec as JSON without writing anything.
    Plan {
        /// Spec file path or http(s) URL.
        spec: String,

        #[command(flatten)]
        instructions: InstructionsArgs,

        /// External planner command line.
        #[arg(long)]
        planner_cmd: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `specdocs generate`.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct GenerateArgs {
    /// Spec file path or http(s) URL.
    pub spec: String,

    /// Output directory (defaults to `defaults.output_dir`).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub instructions: InstructionsArgs,

    /// Regenerate every section regardless of stored hashes.
    #[arg(long)]
    pub force: bool,

    /// External planner command line, e.g. "node planner.js".
    #[arg(long)]
    pub planner_cmd: Option<String>,

    /// External writer command line, e.g. "node writer.js".
    #[arg(long)]
    pub writer_cmd: Option<String>,

    /// Maximum concurrent writer calls.
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Record new hashes for sections whose writer failed.
    #[arg(long)]
    pub refresh_failed_hashes: bool,
}

/// Free-form instructions, inline or from a file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct InstructionsArgs {
    /// Instructions passed to the planner and writer.
    #[arg(long, conflicts_with = "instructions_file")]
    pub instructions: Option<String>,

    /// Read instructions from a file.
    #[arg(long)]
    pub instructions_file: Option<PathBuf>,
}

impl InstructionsArgs {
    fn load(&self) -> Result<Option<String>> {
        if let Some(text) = &self.instructions {
            return Ok(Some(text.clone()));
        }
        match &self.instructions_file {
            Some(path) => std::fs::read_to_string(path)
                .map(Some)
                .wrap_err_with(|| format!("failed to read instructions from {}", path.display())),
            None => Ok(None),
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "specdocs=info",
        1 => "specdocs=debug",
        _ => "specdocs=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate(args) => cmd_generate(args).await,
        Command::Build { out, site, title } => cmd_build(out, site, title),
        Command::Plan {
            spec,
            instructions,
            planner_cmd,
        } => cmd_plan(&spec, &instructions, planner_cmd.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let config = load_config()?;
    let generate_config = resolve_generate_config(&args, &config)?;
    let planner = select_planner(resolve_command(args.planner_cmd.as_deref(), &config.generation.planner_cmd));
    let writer = select_writer(resolve_command(args.writer_cmd.as_deref(), &config.generation.writer_cmd));

    info!(
        spec = %args.spec,
        output = %generate_config.output_root.display(),
        force = generate_config.force,
        "generating documentation"
    );

    let reporter = CliProgress::new();
    let result = specdocs_core::generate(
        &args.spec,
        &generate_config,
        planner.as_ref(),
        writer,
        &reporter,
    )
    .await?;

    print_generate_summary(&result, &generate_config.output_root);

    if !result.failed.is_empty() {
        return Err(eyre!(
            "{} section(s) failed: {}",
            result.failed.len(),
            result.failed.join(", ")
        ));
    }
    Ok(())
}

fn print_generate_summary(result: &GenerateResult, output_root: &Path) {
    let outcome = match result.outcome {
        GenerateOutcome::UpToDate => "up to date",
        GenerateOutcome::MetadataRefreshed => "metadata refreshed",
        GenerateOutcome::Generated => "generated",
    };

    println!();
    println!("  Run:         {}", result.run_id);
    println!("  Outcome:     {outcome}");
    println!("  Sections:    {}", result.planned);
    println!("  Regenerated: {}", result.regenerated);
    println!("  Cached:      {}", result.cached);
    if result.orphans_removed > 0 {
        println!("  Removed:     {}", result.orphans_removed);
    }
    if !result.failed.is_empty() {
        println!("  Failed:      {}", result.failed.join(", "));
    }
    println!("  Output:      {}", output_root.display());
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn cmd_build(out: Option<PathBuf>, site: Option<PathBuf>, title: Option<String>) -> Result<()> {
    let config = load_config()?;
    let mut build_config = SiteBuildConfig::new(
        out.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir)),
        site.unwrap_or_else(|| PathBuf::from(&config.defaults.site_dir)),
    );
    build_config.default_title = title.unwrap_or(config.site.default_title);

    let result = build_site(&build_config)?;

    println!();
    println!("  Pages:   {}", result.pages_rendered);
    if !result.skipped.is_empty() {
        println!("  Skipped: {}", result.skipped.join(", "));
    }
    println!("  Site:    {}", result.site_root.display());
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();
    Ok(())
}

async fn cmd_plan(spec: &str, instructions: &InstructionsArgs, planner_cmd: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let instructions = instructions.load()?;
    let planner = select_planner(resolve_command(planner_cmd, &config.generation.planner_cmd));

    let index = specdocs_spec::load_spec(spec).await?;
    let plan = plan_sections(&index, planner.as_ref(), instructions.as_deref()).await?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Flag and config resolution
// ---------------------------------------------------------------------------

/// Merge CLI flags over config file values.
fn resolve_generate_config(args: &GenerateArgs, config: &AppConfig) -> Result<GenerateConfig> {
    let output_root = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));

    let mut generate_config = GenerateConfig::new(output_root);
    generate_config.instructions = args.instructions.load()?;
    generate_config.force = args.force;
    generate_config.max_concurrency = args
        .max_concurrency
        .unwrap_or(config.generation.max_concurrency)
        .max(1);
    generate_config.refresh_failed_hashes =
        args.refresh_failed_hashes || config.generation.refresh_failed_hashes;
    Ok(generate_config)
}

/// A command given on the command line replaces the configured one.
fn resolve_command(flag: Option<&str>, configured: &[String]) -> Vec<String> {
    match flag {
        Some(line) => line.split_whitespace().map(String::from).collect(),
        None => configured.to_vec(),
    }
}

fn select_planner(argv: Vec<String>) -> Box<dyn Planner> {
    if argv.is_empty() {
        Box::new(TagPlanner)
    } else {
        Box::new(CommandPlanner::new(argv))
    }
}

fn select_writer(argv: Vec<String>) -> Arc<dyn Writer> {
    if argv.is_empty() {
        Arc::new(ReferenceWriter)
    } else {
        Arc::new(CommandWriter::new(argv))
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn section_written(&self, id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {id}"));
    }

    fn done(&self, _result: &GenerateResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
