//! Address-list producers
//!
//! Both producers write batches in the distributor's input format: one
//! `host:port` per line, one blank line after each batch.

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::config::resolve_addr;
use crate::error::ConfigError;

/// Period of the static producer
pub const STATIC_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Delay before re-arming a watch that could not be set up
pub const WATCH_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// How often an armed watch checks the file for changes
pub const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Check that every address resolves, stopping at the first one that doesn't.
pub async fn validate_all(addrs: &[String]) -> Result<(), ConfigError> {
    for addr in addrs {
        resolve_addr(addr).await?;
    }
    Ok(())
}

/// Write `addrs` followed by the batch terminator.
pub async fn emit_batch<W>(out: &mut W, addrs: &[String]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = String::new();
    for addr in addrs {
        buf.push_str(addr);
        buf.push('\n');
    }
    buf.push('\n');
    out.write_all(buf.as_bytes()).await?;
    out.flush().await
}

/// Emit the whole list every `period`, forever.
pub async fn run_static<W>(out: &mut W, addrs: &[String], period: Duration) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        emit_batch(out, addrs).await?;
    }
}

/// Usable addresses in a list file: trimmed, `#` comments and lines that
/// do not resolve dropped.
pub async fn filter_addresses(contents: &str) -> Vec<String> {
    let mut addrs = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match resolve_addr(line).await {
            Ok(_) => addrs.push(line.to_string()),
            Err(e) => warn!(error = %e, "Skipping address"),
        }
    }
    addrs
}

/// Read `path` and emit its addresses as one batch. Nothing is written when
/// no line is usable. Returns whether a batch was written.
pub async fn reload_file<W>(path: &Path, out: &mut W) -> io::Result<bool>
where
    W: AsyncWrite + Unpin,
{
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read address file");
            return Ok(false);
        }
    };

    info!(path = %path.display(), "Reloading");
    let addrs = filter_addresses(&contents).await;
    if addrs.is_empty() {
        return Ok(false);
    }
    emit_batch(out, &addrs).await?;
    Ok(true)
}

/// Modification stamp of a watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

async fn stamp(path: &Path) -> io::Result<Stamp> {
    let meta = tokio::fs::metadata(path).await?;
    Ok(Stamp {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

/// Watch `path` and emit a batch each time it is modified.
///
/// Arming the watch does not emit. When the file is missing, or disappears
/// while watched, the watch is re-armed every [`WATCH_RETRY_INTERVAL`].
/// Returns only when writing to `out` fails.
pub async fn watch_file<W>(path: &Path, out: &mut W, poll: Duration) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let mut current = match stamp(path).await {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Watch setup failed");
                tokio::time::sleep(WATCH_RETRY_INTERVAL).await;
                continue;
            }
        };
        info!(path = %path.display(), "Watching");

        loop {
            tokio::time::sleep(poll).await;
            match stamp(path).await {
                Ok(next) if next != current => {
                    current = next;
                    reload_file(path, out).await?;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Watched file went away");
                    break;
                }
            }
        }

        tokio::time::sleep(WATCH_RETRY_INTERVAL).await;
    }
}
