//! Core policy engine and scheduler for complexratiod
//!
//! This crate is the heart of complexratiod, containing:
//! - The stop decision (ratio stop, force stop, first match wins)
//! - The per-tick scan over every job, with lazy per-group policy creation
//! - Group bootstrap from the host's label set
//! - The fixed-period scheduler and the enable/disable lifecycle

mod decision;
mod engine;
mod events;
mod plugin;
mod scheduler;

pub use decision::*;
pub use engine::*;
pub use events::*;
pub use plugin::*;
pub use scheduler::*;
