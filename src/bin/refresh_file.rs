use std::path::PathBuf;

use clap::Parser;

use switchyard::producer::{self, WATCH_POLL_INTERVAL};

/// Print the valid addresses of a file as a distributor batch whenever it changes
#[derive(Parser, Debug)]
#[command(name = "switchyard-refresh-file", version)]
struct Cli {
    /// File holding one HOST:PORT per line
    path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    switchyard::telemetry::init();

    let cli = Cli::parse();
    let mut out = tokio::io::stdout();
    producer::watch_file(&cli.path, &mut out, WATCH_POLL_INTERVAL).await?;
    Ok(())
}
