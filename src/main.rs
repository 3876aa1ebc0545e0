//! wisp - pull ComfyUI workflows out of PNG images and keep a history of them.

mod cli;
mod display;
mod load;

use clap::Parser;
use miette::IntoDiagnostic;
use time::UtcOffset;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wisp_config::Config;

use crate::cli::{Cli, report};

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level when both are given.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Must be determined while the process is still single-threaded.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let config = Config::load(cli.config.as_deref()).map_err(report)?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().into_diagnostic()?;
    let mut stdout = std::io::stdout().lock();
    runtime.block_on(cli.run(&config, offset, &mut stdout))
}
