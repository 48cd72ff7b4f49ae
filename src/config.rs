//! Runtime configuration
//!
//! Fronts are described by positional command-line tokens; connection
//! ceilings come from the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use crate::admission::{DEFAULT_FRONT_CAPACITY, DEFAULT_GLOBAL_CAPACITY};
use crate::error::{ConfigError, ECHO_FRONT_FORMAT, PROXY_FRONT_FORMAT};
use crate::feed::Endpoint;

/// Process-wide connection ceiling
pub const GLOBAL_CAPACITY_VAR: &str = "SWITCHYARD_MAX_CONNECTIONS";

/// Per-front connection ceiling
pub const FRONT_CAPACITY_VAR: &str = "SWITCHYARD_FRONT_CONNECTIONS";

#[derive(Debug, Clone)]
pub struct Config {
    pub global_capacity: usize,
    pub front_capacity: usize,
}

impl Config {
    pub fn load() -> Self {
        Self {
            global_capacity: capacity_from_env(GLOBAL_CAPACITY_VAR, DEFAULT_GLOBAL_CAPACITY),
            front_capacity: capacity_from_env(FRONT_CAPACITY_VAR, DEFAULT_FRONT_CAPACITY),
        }
    }
}

fn capacity_from_env(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

/// `TCPADDR,FEEDURL[,FEEDURL...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyFrontSpec {
    pub listen_addr: String,
    pub feeds: Vec<Endpoint>,
}

impl FromStr for ProxyFrontSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split(',').collect();
        if tokens.len() < 2 || tokens[0].is_empty() {
            return Err(ConfigError::BadFront {
                spec: s.to_string(),
                expected: PROXY_FRONT_FORMAT,
            });
        }

        let feeds = tokens[1..]
            .iter()
            .map(|t| t.parse::<Endpoint>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            listen_addr: tokens[0].to_string(),
            feeds,
        })
    }
}

/// `HOST:PORT`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoFrontSpec {
    pub listen_addr: String,
}

impl FromStr for EchoFrontSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.contains(',') {
            return Err(ConfigError::BadFront {
                spec: s.to_string(),
                expected: ECHO_FRONT_FORMAT,
            });
        }
        Ok(Self {
            listen_addr: s.to_string(),
        })
    }
}

/// Resolve a `host:port` string to its first socket address.
pub async fn resolve_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    let bad = |reason: String| ConfigError::BadAddress {
        addr: addr.to_string(),
        reason,
    };

    let mut resolved = tokio::net::lookup_host(addr)
        .await
        .map_err(|e| bad(e.to_string()))?;
    resolved
        .next()
        .ok_or_else(|| bad("resolves to no address".to_string()))
}
