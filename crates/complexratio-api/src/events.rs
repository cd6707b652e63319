//! Event types for complexratiod -> client streaming

use chrono::{DateTime, Local};
use complexratio_util::JobId;
use serde::{Deserialize, Serialize};

use crate::{StopReason, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: Local::now(),
            payload,
        }
    }
}

/// All possible events from the daemon to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A job was paused by policy
    JobStopped {
        job_id: JobId,
        name: String,
        group: String,
        reason: StopReason,
        ratio: f64,
        seeding_hours: f64,
    },

    /// A policy record was created with default values
    GroupCreated { group: String },

    /// Policy records were changed through the config API
    ConfigUpdated { groups: Vec<String> },

    /// Daemon is shutting down
    Shutdown,
}
