//! Audit event types

use chrono::{DateTime, Local};
use complexratio_api::StopReason;
use complexratio_util::JobId;
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Policy enforcement enabled
    PluginEnabled {
        group_count: usize,
        groups_available: bool,
    },

    /// Policy enforcement disabled
    PluginDisabled,

    /// A policy record was created with default values
    GroupCreated { group: String },

    /// A job was paused by policy
    JobStopped {
        job_id: JobId,
        name: String,
        group: String,
        reason: StopReason,
        ratio: f64,
        seeding_hours: f64,
    },

    /// Policy records changed through the config API
    ConfigUpdated { groups: Vec<String> },

    /// Client connected
    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    /// Client disconnected
    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: Local::now(),
            event,
        }
    }
}
