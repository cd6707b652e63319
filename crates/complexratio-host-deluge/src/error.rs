//! Deluge adapter errors

use complexratio_host_api::HostError;
use thiserror::Error;

/// Deluge Web UI error code for a missing or expired session
pub const NOT_AUTHENTICATED: i64 = 1;

#[derive(Debug, Error)]
pub enum DelugeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Login rejected by the Web UI")]
    LoginRejected,

    #[error("No Deluge daemon available to connect to")]
    NoDaemon,

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for DelugeError {
    fn from(e: serde_json::Error) -> Self {
        DelugeError::Decode(e.to_string())
    }
}

impl From<DelugeError> for HostError {
    fn from(e: DelugeError) -> Self {
        match e {
            DelugeError::Http(e) => HostError::Unreachable(e.to_string()),
            DelugeError::Rpc { code, .. } if code == NOT_AUTHENTICATED => {
                HostError::NotAuthenticated
            }
            DelugeError::LoginRejected => HostError::NotAuthenticated,
            DelugeError::NoDaemon => HostError::Unreachable("no daemon".into()),
            e @ (DelugeError::Rpc { .. } | DelugeError::Decode(_)) => {
                HostError::Protocol(e.to_string())
            }
        }
    }
}

pub type DelugeResult<T> = Result<T, DelugeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_mapping() {
        let e: HostError = DelugeError::Rpc {
            code: NOT_AUTHENTICATED,
            message: "Not authenticated".into(),
        }
        .into();
        assert!(matches!(e, HostError::NotAuthenticated));

        let e: HostError = DelugeError::Rpc {
            code: 2,
            message: "Unknown method".into(),
        }
        .into();
        assert!(matches!(e, HostError::Protocol(_)));

        let e: HostError = DelugeError::NoDaemon.into();
        assert!(matches!(e, HostError::Unreachable(_)));
    }
}
