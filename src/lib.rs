//! Switchyard - dynamic TCP reverse proxy toolkit
//!
//! Proxy fronts tunnel clients to backends whose addresses arrive over a
//! push/pull feed fed by a distributor.

pub mod admission;
pub mod config;
pub mod distributor;
pub mod error;
pub mod feed;
pub mod producer;
pub mod server;
pub mod telemetry;
