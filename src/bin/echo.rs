use clap::Parser;
use tracing::info;

use switchyard::admission::Admission;
use switchyard::config::{Config, EchoFrontSpec};
use switchyard::error::ECHO_FRONT_FORMAT;
use switchyard::server::{self, EchoFront};

/// TCP echo server with admission control
#[derive(Parser, Debug)]
#[command(name = "switchyard-echo", version)]
struct Cli {
    /// Listen addresses: HOST:PORT
    #[arg(value_name = "FRONT")]
    fronts: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    switchyard::telemetry::init();

    let cli = Cli::parse();
    let cfg = Config::load();
    let admission = Admission::new(cfg.global_capacity);
    info!(
        max_connections = cfg.global_capacity,
        front_connections = cfg.front_capacity,
        "Starting echo server"
    );

    let front_capacity = cfg.front_capacity;
    let fronts = server::build_fronts(&cli.fronts, ECHO_FRONT_FORMAT, move |token| {
        let admission = admission.clone();
        async move {
            let spec: EchoFrontSpec = token.parse()?;
            EchoFront::create(&admission, front_capacity, &spec).await
        }
    })
    .await?;

    server::serve(fronts).await;
    Ok(())
}
