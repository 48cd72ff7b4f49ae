use clap::Parser;
use tracing::info;

use switchyard::admission::Admission;
use switchyard::config::{Config, ProxyFrontSpec};
use switchyard::error::PROXY_FRONT_FORMAT;
use switchyard::server::{self, ProxyFront};

/// Dynamic TCP reverse proxy
#[derive(Parser, Debug)]
#[command(name = "switchyard-proxy", version)]
struct Cli {
    /// Front descriptions: TCPADDR,FEEDURL[,FEEDURL...]
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
        "Starting proxy"
    );

    let front_capacity = cfg.front_capacity;
    let fronts = server::build_fronts(&cli.fronts, PROXY_FRONT_FORMAT, move |token| {
        let admission = admission.clone();
        async move {
            let spec: ProxyFrontSpec = token.parse()?;
            ProxyFront::create(&admission, front_capacity, &spec).await
        }
    })
    .await?;

    server::serve(fronts).await;
    Ok(())
}
