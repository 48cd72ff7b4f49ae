use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;

use switchyard::distributor::{Distributor, Policy};
use switchyard::feed::{Endpoint, Publisher};

/// Publish one backend address per subscriber request, from batches read on stdin
#[derive(Parser, Debug)]
#[command(name = "switchyard-distributor", version)]
struct Cli {
    /// Pick addresses at random instead of round-robin
    #[arg(long)]
    rand: bool,

    /// Feed endpoints to listen on (tcp://HOST:PORT or ipc://PATH)
    #[arg(value_name = "FEEDURL")]
    endpoints: Vec<String>,
}

/// Accept the historical single-dash `-rand` spelling.
fn args() -> impl Iterator<Item = String> {
    std::env::args().map(|arg| if arg == "-rand" { "--rand".to_string() } else { arg })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    switchyard::telemetry::init();

    let cli = Cli::parse_from(args());
    if cli.endpoints.is_empty() {
        anyhow::bail!("Missing arguments: at least one endpoint to bind to");
    }

    let publisher = Publisher::new();
    for url in &cli.endpoints {
        let endpoint: Endpoint = url.parse()?;
        publisher
            .listen(&endpoint)
            .await
            .with_context(|| format!("failed to listen on {url}"))?;
    }

    let policy = if cli.rand {
        Policy::random()
    } else {
        Policy::round_robin()
    };
    let distributor = Distributor::new(publisher, policy);
    let input = BufReader::new(tokio::io::stdin());

    tokio::select! {
        res = distributor.run(input) => {
            res?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
