//! Error types shared by the proxy, the feed and the producers.

use thiserror::Error;

/// Expected shape of a proxy front token.
pub const PROXY_FRONT_FORMAT: &str = "TCPADDR,FEEDURL[,FEEDURL...]";

/// Expected shape of an echo front token.
pub const ECHO_FRONT_FORMAT: &str = "HOST:PORT";

/// Errors raised while turning command-line tokens into fronts or endpoints.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Front token with the wrong number of fields
    #[error("invalid front description {spec:?}, expecting {expected}")]
    BadFront {
        spec: String,
        expected: &'static str,
    },

    /// `host:port` that does not resolve
    #[error("invalid address {addr:?}: {reason}")]
    BadAddress { addr: String, reason: String },

    /// Feed URL that cannot be parsed or uses an unknown scheme
    #[error("invalid feed endpoint {url:?}: {reason}")]
    BadEndpoint { url: String, reason: String },
}

/// Errors raised by the pub/sub feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Socket level failure
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer spoke something other than the complementary protocol
    #[error("feed handshake failed: {0}")]
    Handshake(String),

    /// No publisher is connected and nothing is buffered
    #[error("no publisher connected")]
    NoPeer,

    /// The socket has been closed
    #[error("feed socket closed")]
    Closed,
}

/// Reasons a tunnel never reaches the relaying state.
#[derive(Error, Debug)]
pub enum TunnelError {
    /// No backend address could be received from the feed
    #[error("no backend address available: {0}")]
    Resolve(#[from] FeedError),

    /// The received backend address is not usable
    #[error("invalid backend address {0:?}")]
    BadBackend(String),

    /// Dialing the backend failed
    #[error("failed to connect to backend {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
