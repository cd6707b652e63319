//! Host adapter trait interfaces for complexratiod
//!
//! This crate defines the interface between the policy core and the
//! torrent client hosting the jobs. It contains no client-specific code itself.

mod capabilities;
mod mock;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use traits::*;
