mod constants;

use anyhow::{Context, Result};
use clap::Parser;
use sigmap_core::{Config, OutputPaths};
use sigmap_ingest::{open_source, run_batch, BatchReport, RunMode};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use constants::*;

#[derive(Parser, Debug)]
#[command(about = "Fold new signal readings into the grid heatmap artifact")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Ignore the prior artifact and watermark and refetch every record
    #[arg(long)]
    full: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let cfg = Config::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let source = open_source(&cfg.feed).context("opening record feed")?;
    let paths = cfg.output_paths();
    let mode = if args.full {
        RunMode::FullRebuild
    } else {
        RunMode::Incremental
    };

    let report = run_batch(source.as_ref(), &paths, cfg.precision, mode)
        .await
        .context("heatmap run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report, &paths);
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &BatchReport, paths: &OutputPaths) {
    let label = match report.mode {
        RunMode::Incremental => "incremental",
        RunMode::FullRebuild => "full rebuild",
    };
    println!("sigmap {} from {}", label, report.source);
    println!(
        "  records:   {} fetched, {} rejected",
        report.merge.fetched, report.merge.rejected
    );
    println!(
        "  cells:     {} ({} new, {} replaced)",
        report.cells, report.merge.inserted, report.merge.replaced
    );
    println!(
        "  watermark: {} -> {}",
        report.previous_watermark, report.watermark
    );
    for path in &paths.artifacts {
        println!("  wrote:     {}", path.display());
    }
    println!("[ok] heatmap written to {} destinations", report.artifacts);
}
