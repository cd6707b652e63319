//! Raw configuration schema (as parsed from TOML)

use complexratio_api::PolicyDocument;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service paths
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Connection to the Deluge Web UI
    pub deluge: RawDelugeConfig,

    /// Initial policy records, applied only to groups not yet stored
    #[serde(default)]
    pub policies: PolicyDocument,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,
}

/// Deluge Web UI connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawDelugeConfig {
    /// Web UI base URL, e.g. `http://127.0.0.1:8112`
    pub url: String,

    /// Web UI password
    #[serde(default)]
    pub password: String,

    /// Per-request timeout (default: 10)
    pub request_timeout_seconds: Option<u64>,

    /// Daemon host the Web UI should connect to (default: first known host)
    pub host_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_policies_table() {
        let toml_str = r#"
            config_version = 1

            [deluge]
            url = "http://localhost:8112"
            password = "deluge"

            [policies.default]
            activated = true
            ratio = 2.0
            time = 48
            force_stop = 336

            [policies."Linux ISOs"]
            ratio = 1.0
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.policies.len(), 2);

        let default = config.policies["default"];
        assert!(default.activated);
        assert_eq!(default.time_threshold, 48.0);
        assert_eq!(default.force_stop_threshold, 336.0);

        let isos = config.policies["Linux ISOs"];
        assert!(!isos.activated);
        assert_eq!(isos.ratio_threshold, 1.0);
    }

    #[test]
    fn service_section_is_optional() {
        let toml_str = r#"
            config_version = 1

            [deluge]
            url = "http://localhost:8112"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert!(config.service.socket_path.is_none());
        assert!(config.policies.is_empty());
        assert!(config.deluge.password.is_empty());
    }
}
