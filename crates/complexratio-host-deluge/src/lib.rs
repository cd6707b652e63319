//! Deluge host adapter for complexratiod
//!
//! Talks to a Deluge daemon through the Web UI's JSON-RPC endpoint:
//! - Session login and daemon connection
//! - Torrent listing, status and pause
//! - Label plugin detection and label listing

mod client;
mod error;
mod host;
mod rpc;

pub use client::*;
pub use error::*;
pub use host::*;
pub use rpc::*;
