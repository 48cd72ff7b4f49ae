//! Push/pull message feed
//!
//! Carries backend addresses from distributors to proxy fronts. One message
//! is the raw bytes of one address; there are no acknowledgements and no
//! sequence numbers.
//!
//! The framing follows the scalability-protocols TCP/IPC mapping so the feed
//! can talk to nanomsg-family pipeline sockets:
//!
//! ```text
//!   handshake   00 'S' 'P' 00 | proto (u16 BE) | 00 00
//!   message     length (u64 BE) | payload
//! ```
//!
//! - **`endpoint`**: `tcp://` and `ipc://` URL parsing
//! - **`transport`**: dialing and listening for each scheme
//! - **`wire`**: handshake and message codec
//! - **`publisher`**: the push side, bound by the distributor
//! - **`subscriber`**: the pull side, dialed by proxy fronts

pub mod endpoint;
pub mod publisher;
pub mod subscriber;
mod transport;
mod wire;

pub use endpoint::Endpoint;
pub use publisher::Publisher;
pub use subscriber::Subscriber;
pub use wire::MAX_MESSAGE_SIZE;
