//! Deluge implementation of the host traits

use async_trait::async_trait;
use complexratio_api::JobSnapshot;
use complexratio_host_api::{GroupResolver, HostCapabilities, HostError, HostResult, JobSource};
use complexratio_util::JobId;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::{
    pause_params, DelugeClient, DelugeError, DelugeResult, HostEntry, TorrentStatus, STATUS_KEYS,
};

/// Name of Deluge's grouping plugin
pub const LABEL_PLUGIN: &str = "Label";

pub struct DelugeHost {
    client: DelugeClient,
    /// Daemon to attach to; the first configured one when unset
    host_id: Option<String>,
    healthy: AtomicBool,
}

impl DelugeHost {
    pub fn new(client: DelugeClient, host_id: Option<String>) -> Self {
        Self {
            client,
            host_id,
            healthy: AtomicBool::new(false),
        }
    }

    /// Log in and make sure the Web UI is attached to a daemon
    pub async fn connect(&self) -> DelugeResult<()> {
        let result = self.attach().await;
        self.healthy.store(result.is_ok(), Ordering::Relaxed);
        result
    }

    async fn attach(&self) -> DelugeResult<()> {
        self.client.login().await?;

        let connected: bool = self.client.call("web.connected", json!([])).await?;
        if connected {
            debug!("Web UI already attached to a daemon");
            return Ok(());
        }

        let hosts = HostEntry::parse_list(self.client.call("web.get_hosts", json!([])).await?)?;
        let target = match &self.host_id {
            Some(id) => hosts.into_iter().find(|h| &h.id == id),
            None => hosts.into_iter().next(),
        }
        .ok_or(DelugeError::NoDaemon)?;

        let _: Value = self.client.call("web.connect", json!([target.id])).await?;
        info!(host = %target.host, port = target.port, "Attached to Deluge daemon");
        Ok(())
    }

    /// Work out which optional facilities the daemon offers
    pub async fn detect_capabilities(&self) -> HostCapabilities {
        let plugins: DelugeResult<Vec<String>> =
            self.client.call("core.get_enabled_plugins", json!([])).await;

        match plugins {
            Ok(plugins) if plugins.iter().any(|p| p == LABEL_PLUGIN) => {
                info!("Label plugin enabled, groups follow torrent labels");
                HostCapabilities::with_groups()
            }
            Ok(_) => {
                info!("Label plugin not enabled");
                HostCapabilities::minimal()
            }
            Err(e) => {
                warn!(error = %e, "Failed to list enabled plugins, assuming no labels");
                HostCapabilities::minimal()
            }
        }
    }

    /// Torrent IDs in the session, reattaching once if the Web UI lost its daemon
    async fn session_state(&self) -> DelugeResult<Vec<String>> {
        match self.client.call("core.get_session_state", json!([])).await {
            Err(DelugeError::Rpc { code, message }) => {
                debug!(code, message = %message, "Listing torrents failed, reattaching");
                self.attach().await?;
                self.client.call("core.get_session_state", json!([])).await
            }
            other => other,
        }
    }

    /// Record reachability from a call outcome
    fn track<T>(&self, result: DelugeResult<T>) -> HostResult<T> {
        let reachable = !matches!(result, Err(DelugeError::Http(_)));
        self.healthy.store(reachable, Ordering::Relaxed);
        result.map_err(HostError::from)
    }
}

#[async_trait]
impl JobSource for DelugeHost {
    async fn list_jobs(&self) -> HostResult<Vec<JobId>> {
        let ids = self.session_state().await;
        Ok(self.track(ids)?.into_iter().map(JobId::from).collect())
    }

    async fn get_status(&self, id: &JobId) -> HostResult<JobSnapshot> {
        let status: DelugeResult<Value> = self
            .client
            .call("core.get_torrent_status", json!([id.as_str(), STATUS_KEYS]))
            .await;
        let status = self.track(status)?;

        // Unknown torrents come back as an empty dict
        if status.as_object().is_some_and(|o| o.is_empty()) {
            return Err(HostError::JobNotFound(id.clone()));
        }

        let status: TorrentStatus = serde_json::from_value(status)
            .map_err(|e| HostError::Protocol(format!("torrent {}: {}", id, e)))?;
        Ok(status.into_snapshot(id.clone()))
    }

    async fn pause(&self, id: &JobId) -> HostResult<()> {
        let result: DelugeResult<Value> =
            self.client.call("core.pause_torrent", pause_params(id)).await;
        self.track(result)
            .map(|_| ())
            .map_err(|e| HostError::PauseFailed(e.to_string()))
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl GroupResolver for DelugeHost {
    async fn list_groups(&self) -> HostResult<Vec<String>> {
        let labels: DelugeResult<Vec<String>> =
            self.client.call("label.get_labels", json!([])).await;
        self.track(labels)
    }
}
