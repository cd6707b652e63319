//! Default paths for complexratio components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/complexratio/complexratiod.sock`
//!   or `/tmp/complexratio-$USER/complexratiod.sock`
//! - Data: `$XDG_DATA_HOME/complexratio` or `~/.local/share/complexratio`
//! - Config: `$XDG_CONFIG_HOME/complexratio/config.toml` or `~/.config/complexratio/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const COMPLEXRATIO_SOCKET_ENV: &str = "COMPLEXRATIO_SOCKET";

const SOCKET_FILENAME: &str = "complexratiod.sock";

const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "complexratio";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$COMPLEXRATIO_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/complexratio/complexratiod.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/complexratio-$USER/complexratiod.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(COMPLEXRATIO_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking the override env var.
/// Used for default values in configs where the env var is checked separately.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// `$COMPLEXRATIO_DATA_DIR` is handled by the daemon's command line, not here.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default daemon configuration file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/complexratio/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/complexratio/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}
