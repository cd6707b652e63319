//! Command types for the complexratiod protocol

use complexratio_util::ClientId;
use serde::{Deserialize, Serialize};

use crate::{ClientRole, HealthStatus, PolicyDocument, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    PermissionDenied,
    ValidationFailed,
    StoreError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Return every group's policy record
    GetConfig,

    /// Overwrite or insert the given groups; other groups are untouched (admin only)
    SetConfig { update: PolicyDocument },

    /// Get health status
    GetHealth,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Config { policies: PolicyDocument },
    ConfigUpdated { groups: Vec<String> },
    Health(HealthStatus),
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyRecord;

    #[test]
    fn set_config_request_wire_format() {
        let mut update = PolicyDocument::new();
        update.insert("movies".into(), PolicyRecord::activated(2.0, 24.0, 168.0));

        let req = Request::new(7, Command::SetConfig { update });
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["command"]["type"], "set_config");
        assert_eq!(json["command"]["update"]["movies"]["force_stop"], 168.0);

        let parsed: Request = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.request_id, 7);
        assert!(matches!(
            parsed.command,
            Command::SetConfig { update } if update.contains_key("movies")
        ));
    }

    #[test]
    fn config_response_keeps_group_named_type() {
        // Group names are user data and must not clash with the enum tag
        let mut policies = PolicyDocument::new();
        policies.insert("type".into(), PolicyRecord::default());

        let resp = Response::success(1, ResponsePayload::Config { policies });
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        match parsed.result {
            ResponseResult::Ok(ResponsePayload::Config { policies }) => {
                assert!(policies.contains_key("type"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn error_response_serialization() {
        let resp = Response::error(
            3,
            ErrorInfo::new(ErrorCode::PermissionDenied, "Admin role required"),
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("permission_denied"));
    }
}
