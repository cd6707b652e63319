//! Configuration validation

use complexratio_api::{PolicyDocument, PolicyRecord};
use thiserror::Error;

use crate::schema::{RawConfig, RawDelugeConfig};

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Group name cannot be empty")]
    EmptyGroupName,

    #[error("Group '{group}': {field} must be a finite number >= 0 (got {value})")]
    InvalidThreshold {
        group: String,
        field: &'static str,
        value: f64,
    },

    #[error("Deluge config error: {0}")]
    DelugeError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = validate_deluge(&config.deluge);
    errors.extend(validate_policy_document(&config.policies));
    errors
}

fn validate_deluge(deluge: &RawDelugeConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let url = deluge.url.trim();
    if url.is_empty() {
        errors.push(ValidationError::DelugeError("url cannot be empty".into()));
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ValidationError::DelugeError(format!(
            "url must start with http:// or https:// (got '{}')",
            url
        )));
    }

    if deluge.request_timeout_seconds == Some(0) {
        errors.push(ValidationError::DelugeError(
            "request_timeout_seconds must be greater than 0".into(),
        ));
    }

    errors
}

/// Validate every record of a policy document
pub fn validate_policy_document(doc: &PolicyDocument) -> Vec<ValidationError> {
    doc.iter()
        .flat_map(|(group, record)| validate_policy_record(group, record))
        .collect()
}

/// Validate a single group's record: non-empty name, thresholds finite and >= 0
pub fn validate_policy_record(group: &str, record: &PolicyRecord) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Only a truly empty label falls back to the default group
    if group.is_empty() {
        errors.push(ValidationError::EmptyGroupName);
    }

    let thresholds = [
        ("ratio", record.ratio_threshold),
        ("time", record.time_threshold),
        ("force_stop", record.force_stop_threshold),
    ];
    for (field, value) in thresholds {
        if !value.is_finite() || value < 0.0 {
            errors.push(ValidationError::InvalidThreshold {
                group: group.to_string(),
                field,
                value,
            });
        }
    }

    errors
}
