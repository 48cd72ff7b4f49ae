use clap::Parser;

use switchyard::producer::{self, STATIC_REFRESH_PERIOD};

/// Print a fixed address list as a distributor batch, once per minute
#[derive(Parser, Debug)]
#[command(name = "switchyard-refresh-static", version)]
struct Cli {
    /// Backend addresses: HOST:PORT
    #[arg(value_name = "ADDR", required = true)]
    addrs: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    switchyard::telemetry::init();

    let cli = Cli::parse();
    producer::validate_all(&cli.addrs).await?;

    let mut out = tokio::io::stdout();
    producer::run_static(&mut out, &cli.addrs, STATIC_REFRESH_PERIOD).await?;
    Ok(())
}
