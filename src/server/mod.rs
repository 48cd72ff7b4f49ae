//! Fronts and their accept loops
//!
//! - **`front`**: listening socket plus admission gate, shared by both kinds
//! - **`proxy`**: fronts that tunnel clients to backends read from the feed
//! - **`echo`**: fronts that send clients their own bytes back
//! - **`tunnel`**: one client paired with one backend

pub mod echo;
pub mod front;
pub mod proxy;
pub mod tunnel;

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

pub use echo::EchoFront;
pub use front::Front;
pub use proxy::ProxyFront;
pub use tunnel::{Tunnel, TunnelState};

/// A front with an accept loop
pub trait Serve: Send + Sync + 'static {
    /// Accept clients until the front is closed.
    fn run(self: Arc<Self>) -> impl Future<Output = ()> + Send;

    /// Stop accepting; in-flight connections are left alone.
    fn close(&self);
}

/// Configure one front per token. Failures are logged and skipped; having
/// no front at all is fatal.
pub async fn build_fronts<T, F, Fut>(
    tokens: &[String],
    expected: &str,
    mut build: F,
) -> anyhow::Result<Vec<Arc<T>>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut fronts = Vec::with_capacity(tokens.len());
    for token in tokens {
        match build(token.clone()).await {
            Ok(front) => fronts.push(Arc::new(front)),
            Err(e) => error!(front = %token, error = %format!("{e:#}"), "Failed to configure front"),
        }
    }

    if fronts.is_empty() {
        anyhow::bail!("No valid front found in arguments. Expecting {expected}");
    }
    Ok(fronts)
}

/// Run every front until all accept loops end or a shutdown signal arrives.
pub async fn serve<T: Serve>(fronts: Vec<Arc<T>>) {
    let mut loops = JoinSet::new();
    for front in &fronts {
        loops.spawn(Arc::clone(front).run());
    }

    tokio::select! {
        _ = async { while loops.join_next().await.is_some() {} } => {
            info!("All fronts stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    for front in &fronts {
        front.close();
    }
    loops.shutdown().await;
}
