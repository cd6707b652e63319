//! Shared utilities for complexratio
//!
//! This crate provides:
//! - ID types (JobId, ClientId)
//! - Error types
//! - Default paths for socket, data, and config files

mod error;
mod ids;
mod paths;

pub use error::*;
pub use ids::*;
pub use paths::*;
