//! Marketing Analyzer: campaign performance analysis and charting.
//!
//! Loads campaign data from CSV (or simulates it), computes per-platform and
//! per-campaign metrics, and writes SVG charts plus a JSON run report.

use anyhow::Context;
use campaign_core::config::{AppConfig, InvalidRowPolicy};
use campaign_core::types::RunMode;
use campaign_pipeline::MarketingAnalyzer;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "marketing-analyzer")]
#[command(about = "Analyze marketing campaign performance and render charts")]
#[command(version)]
struct Cli {
    /// Generate synthetic data instead of reading an input file
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// CSV file or directory of CSV files (required unless --dry-run)
    #[arg(long, short, required_unless_present = "dry_run")]
    input: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(long, short, env = "MARKETING_ANALYZER__OUTPUT__DIR")]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Simulator seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of simulated rows (overrides config)
    #[arg(long)]
    rows: Option<usize>,

    /// Fail the run on the first invalid row instead of skipping it
    #[arg(long, default_value_t = false)]
    abort_on_invalid: bool,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "marketing_analyzer=info,campaign_pipeline=info,campaign_ingest=info,campaign_reporting=info"
            .into()
    });
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(Some(path))
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    // Apply CLI overrides
    if let Some(dir) = cli.output {
        config.output.dir = dir;
    }
    if let Some(seed) = cli.seed {
        config.simulator.seed = seed;
    }
    if let Some(rows) = cli.rows {
        config.simulator.row_count = rows;
    }
    if cli.abort_on_invalid {
        config.loader.invalid_rows = InvalidRowPolicy::Abort;
    }

    let mode = if cli.dry_run {
        RunMode::DryRun
    } else {
        RunMode::Live
    };
    info!(
        mode = %mode,
        output_dir = %config.output.dir.display(),
        seed = config.simulator.seed,
        rows = config.simulator.row_count,
        "Configuration loaded"
    );

    let analyzer = MarketingAnalyzer::new(config);
    let report = analyzer
        .run(mode, cli.input.as_deref(), &analyzer.config().output.dir)
        .context("marketing analysis failed")?;

    print!("{}", report.render_text());
    Ok(())
}
