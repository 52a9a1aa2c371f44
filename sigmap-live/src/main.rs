mod poller;
mod server;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use sigmap_core::{artifact, Config};
use sigmap_ingest::{open_source, RecordSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use state::SharedAggregate;

const DEFAULT_CONFIG_PATH: &str = "sigmap.json";
const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Parser, Debug)]
#[command(about = "Keep the signal heatmap current and serve it over HTTP")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Overrides listenAddr from the config
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = Config::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let source: Arc<dyn RecordSource> =
        Arc::from(open_source(&cfg.feed).context("opening record feed")?);
    let paths = cfg.output_paths();

    let prior = artifact::load_prior(&paths, cfg.precision);
    info!(
        "starting with {} cells, watermark={}",
        prior.len(),
        prior.watermark()
    );
    let shared = SharedAggregate::new(prior);

    tokio::spawn(poller::poll_forever(
        Arc::clone(&source),
        shared.clone(),
        paths,
        Duration::from_secs(cfg.poll_interval_seconds),
    ));

    let addr = args.listen.unwrap_or(cfg.listen_addr);
    server::serve(&addr, shared).await
}
