//! Validated service settings

use complexratio_api::PolicyDocument;
use complexratio_util::{data_dir_without_env, socket_path_without_env};
use std::path::PathBuf;
use std::time::Duration;

use crate::schema::{RawConfig, RawDelugeConfig, RawServiceConfig};

/// Default per-request timeout for the Deluge Web UI
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated configuration ready for use by the daemon
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service: ServicePaths,
    pub deluge: DelugeConfig,

    /// Records inserted for groups that have none yet
    pub seed_policies: PolicyDocument,
}

impl ServiceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServicePaths::from_raw(raw.service),
            deluge: DelugeConfig::from_raw(raw.deluge),
            seed_policies: raw.policies,
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone)]
pub struct ServicePaths {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

impl ServicePaths {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(socket_path_without_env),
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
        }
    }

    /// Path of the SQLite database inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("complexratio.db")
    }
}

impl Default for ServicePaths {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// Deluge Web UI connection
#[derive(Debug, Clone)]
pub struct DelugeConfig {
    pub url: String,
    pub password: String,
    pub request_timeout: Duration,
    pub host_id: Option<String>,
}

impl DelugeConfig {
    fn from_raw(raw: RawDelugeConfig) -> Self {
        Self {
            url: raw.url.trim().to_string(),
            password: raw.password,
            request_timeout: raw
                .request_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            host_id: raw.host_id.filter(|h| !h.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let raw = RawConfig {
            config_version: 1,
            service: RawServiceConfig::default(),
            deluge: RawDelugeConfig {
                url: " http://127.0.0.1:8112 ".into(),
                password: String::new(),
                request_timeout_seconds: None,
                host_id: Some(String::new()),
            },
            policies: PolicyDocument::new(),
        };

        let config = ServiceConfig::from_raw(raw);
        assert_eq!(config.deluge.url, "http://127.0.0.1:8112");
        assert_eq!(config.deluge.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(config.deluge.host_id.is_none());
        assert!(config.service.socket_path.to_string_lossy().contains("complexratio"));
        assert!(config.service.database_path().ends_with("complexratio.db"));
    }
}
