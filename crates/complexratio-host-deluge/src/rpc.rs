//! JSON-RPC wire types for the Deluge Web UI

use complexratio_api::JobSnapshot;
use complexratio_util::JobId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{DelugeError, DelugeResult};

/// Torrent status keys read on every tick
pub const STATUS_KEYS: &[&str] = &[
    "active_time",
    "is_seed",
    "seeding_time",
    "paused",
    "ratio",
    "state",
    "name",
    "label",
];

/// Params for `core.pause_torrent`.
///
/// Deluge 1.3 only takes a list of ids and iterates a bare string by
/// character; Deluge 2 accepts the list as well.
pub fn pause_params(id: &JobId) -> Value {
    json!([[id.as_str()]])
}

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub method: &'a str,
    pub params: &'a Value,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
    pub id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorBody {
    pub message: String,
    pub code: i64,
}

impl RpcResponse {
    /// Turn the envelope into the typed result or the RPC error it carries
    pub fn into_result<T: DeserializeOwned>(self) -> DelugeResult<T> {
        if let Some(error) = self.error {
            return Err(DelugeError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(serde_json::from_value(self.result)?)
    }
}

/// Subset of `core.get_torrent_status` the policy needs
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentStatus {
    pub name: String,
    pub is_seed: bool,
    pub paused: bool,
    /// Seconds
    pub seeding_time: f64,
    /// Seconds
    pub active_time: f64,
    /// -1 when nothing has been downloaded
    pub ratio: f64,
    pub state: String,
    /// Only present when the Label plugin is enabled
    #[serde(default)]
    pub label: String,
}

impl TorrentStatus {
    pub fn into_snapshot(self, id: JobId) -> JobSnapshot {
        JobSnapshot {
            id,
            name: self.name,
            is_seed: self.is_seed,
            is_paused: self.paused,
            seeding_time: self.seeding_time,
            active_time: self.active_time,
            ratio: self.ratio,
            state: self.state,
            group: self.label,
        }
    }
}

/// One entry of `web.get_hosts`: `[id, host, port, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct HostEntry {
    pub id: String,
    pub host: String,
    pub port: u16,
}

impl HostEntry {
    pub fn parse_list(value: Value) -> DelugeResult<Vec<HostEntry>> {
        let rows: Vec<Vec<Value>> = serde_json::from_value(value)?;
        rows.into_iter()
            .map(|row| {
                let id = row.first().and_then(Value::as_str);
                let host = row.get(1).and_then(Value::as_str);
                let port = row.get(2).and_then(Value::as_u64);
                match (id, host, port) {
                    (Some(id), Some(host), Some(port)) => Ok(HostEntry {
                        id: id.to_string(),
                        host: host.to_string(),
                        port: u16::try_from(port).map_err(|_| {
                            DelugeError::Decode(format!("port out of range: {}", port))
                        })?,
                    }),
                    _ => Err(DelugeError::Decode(format!("malformed host entry: {:?}", row))),
                }
            })
            .collect()
    }
}
