//! Shared types for the complexratio data model and API

use complexratio_util::JobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Group name that ungrouped jobs fall back to
pub const DEFAULT_GROUP: &str = "default";

/// Stop policy for one group.
///
/// Serialized with the field names of the persisted document
/// (`activated`, `ratio`, `time`, `force_stop`). Time thresholds are in hours.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Whether enforcement is enabled for this group
    #[serde(default)]
    pub activated: bool,

    /// Ratio that must be exceeded (together with `time_threshold`) for a ratio stop
    #[serde(rename = "ratio", default)]
    pub ratio_threshold: f64,

    /// Seeding hours that must be exceeded (together with `ratio_threshold`) for a ratio stop
    #[serde(rename = "time", default)]
    pub time_threshold: f64,

    /// Seeding hours ceiling that stops a job regardless of ratio
    #[serde(rename = "force_stop", default)]
    pub force_stop_threshold: f64,
}

impl PolicyRecord {
    pub fn activated(ratio: f64, time_hours: f64, force_stop_hours: f64) -> Self {
        Self {
            activated: true,
            ratio_threshold: ratio,
            time_threshold: time_hours,
            force_stop_threshold: force_stop_hours,
        }
    }
}

/// Group name -> policy record. Keys are case-sensitive.
pub type PolicyDocument = BTreeMap<String, PolicyRecord>;

/// The document written on first creation: a single inactive `"default"` entry
pub fn default_policy_document() -> PolicyDocument {
    let mut doc = PolicyDocument::new();
    doc.insert(DEFAULT_GROUP.to_string(), PolicyRecord::default());
    doc
}

/// Status of a single job as reported by the host, read fresh each tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub name: String,
    pub is_seed: bool,
    pub is_paused: bool,
    /// Cumulative seeding time in seconds
    pub seeding_time: f64,
    /// Cumulative active time in seconds
    pub active_time: f64,
    pub ratio: f64,
    /// Host-reported state string ("Seeding", "Paused", ...)
    pub state: String,
    /// Group label; empty when the job has none
    #[serde(default)]
    pub group: String,
}

impl JobSnapshot {
    /// Only actively seeding, unpaused jobs are subject to policy
    pub fn is_active_seed(&self) -> bool {
        self.is_seed && !self.is_paused
    }

    /// The group used for policy lookup
    pub fn group_name(&self) -> &str {
        if self.group.is_empty() {
            DEFAULT_GROUP
        } else {
            &self.group
        }
    }

    pub fn seeding_hours(&self) -> f64 {
        self.seeding_time / 3600.0
    }
}

/// Which threshold caused a job to be stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Seeding time and ratio both exceeded their thresholds
    Ratio,
    /// Seeding time exceeded the force-stop ceiling
    ForceStop,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Ratio => write!(f, "ratio stop"),
            StopReason::ForceStop => write!(f, "force stop"),
        }
    }
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Local admin - can read and change policy records
    Admin,
    /// Read-only observer
    Observer,
}

impl ClientRole {
    pub fn can_set_config(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub plugin_enabled: bool,
    pub host_ok: bool,
    pub store_ok: bool,
    /// Whether the host's group resolver was available at enable time
    pub groups_available: bool,
}
