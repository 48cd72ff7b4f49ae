//! Feed endpoint URLs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use url::{Host, Url};

use crate::error::ConfigError;

/// Where a feed socket listens or dials
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `tcp://HOST:PORT`; `*` as host means every interface
    Tcp { host: String, port: u16 },
    /// `ipc://PATH`, a Unix domain socket
    Ipc(PathBuf),
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = |reason: &str| ConfigError::BadEndpoint {
            url: s.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = s.split_once("://").ok_or_else(|| bad("missing scheme"))?;
        match scheme {
            "tcp" => {
                let rest = match rest.strip_prefix("*:") {
                    Some(port) => format!("0.0.0.0:{port}"),
                    None => rest.to_string(),
                };
                let url = Url::parse(&format!("tcp://{rest}")).map_err(|e| bad(&e.to_string()))?;
                if !matches!(url.path(), "" | "/") || url.query().is_some() {
                    return Err(bad("unexpected path"));
                }
                let host = match url.host() {
                    Some(Host::Domain(d)) if !d.is_empty() => d.to_string(),
                    Some(Host::Ipv4(ip)) => ip.to_string(),
                    Some(Host::Ipv6(ip)) => ip.to_string(),
                    _ => return Err(bad("missing host")),
                };
                let port = url.port().ok_or_else(|| bad("missing port"))?;
                Ok(Endpoint::Tcp { host, port })
            }
            "ipc" => {
                if rest.is_empty() {
                    return Err(bad("missing path"));
                }
                Ok(Endpoint::Ipc(PathBuf::from(rest)))
            }
            _ => Err(bad("unsupported scheme, expecting tcp:// or ipc://")),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "tcp://[{host}]:{port}"),
            Endpoint::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Endpoint::Ipc(path) => write!(f, "ipc://{}", path.display()),
        }
    }
}
