mod client;
mod config;
mod error;
mod export;
mod listing;
mod parser;
mod records;

use std::io::{self, BufWriter, Write};
use std::time::Instant;

use clap::Parser;
use tracing::info;

use crate::client::PentaClient;
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "penta_export",
    about = "Export a Pentabarf track's talk submissions as CSV on stdout"
)]
struct Cli {
    #[command(flatten)]
    config: Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the CSV, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let client = PentaClient::new(&cli.config)?;

    let mut out = BufWriter::new(io::stdout().lock());
    let stats = export::run(&client, &cli.config, &mut out).await?;
    out.flush()?;

    info!(
        "Exported {} talks ({} talk pages, {} person pages unavailable) in {}",
        stats.talks,
        stats.missing_talks,
        stats.missing_people,
        format_duration(t0.elapsed())
    );
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
