//! Protocol and data model types for complexratiod
//!
//! This crate defines the types shared by every other crate:
//! - Per-group policy records and the persisted policy document
//! - Job status snapshots read from the host each tick
//! - Commands (requests from clients) and responses
//! - Events (daemon -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
