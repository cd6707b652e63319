//! complexratiod - ratio and seeding-time stop policy for Deluge
//!
//! This is the main entry point for the complexratiod service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Deluge host adapter
//! - Policy engine and scheduler
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use complexratio_api::{
    ClientRole, Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response,
    ResponsePayload,
};
use complexratio_config::load_config;
use complexratio_core::{CoreEvent, PolicyHandle, RatioPlugin};
use complexratio_host_api::JobSource;
use complexratio_host_deluge::{DelugeClient, DelugeHost};
use complexratio_ipc::{IpcServer, ServerMessage};
use complexratio_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use complexratio_util::{default_config_path, ClientId, RatioError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// complexratiod - Pause Deluge torrents once they have seeded enough
#[derive(Parser, Debug)]
#[command(name = "complexratiod")]
#[command(about = "Ratio and seeding-time stop policy for Deluge", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/complexratio/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set COMPLEXRATIO_SOCKET env var)
    #[arg(short, long, env = "COMPLEXRATIO_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set COMPLEXRATIO_DATA_DIR env var)
    #[arg(short, long, env = "COMPLEXRATIO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    plugin: RatioPlugin,
    host: Arc<DelugeHost>,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            deluge_url = %config.deluge.url,
            seed_policies = config.seed_policies.len(),
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.service.socket_path.clone());

        let mut paths = config.service.clone();
        if let Some(data_dir) = &args.data_dir {
            paths.data_dir = data_dir.clone();
        }

        std::fs::create_dir_all(&paths.data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", paths.data_dir))?;

        let db_path = paths.database_path();
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");
        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let client = DelugeClient::new(
            &config.deluge.url,
            config.deluge.password.clone(),
            config.deluge.request_timeout,
        )
        .context("Failed to build Deluge client")?;
        let host = Arc::new(DelugeHost::new(client, config.deluge.host_id.clone()));

        // Scans retry on every tick, so an unreachable Web UI is not fatal
        if let Err(e) = host.connect().await {
            warn!(error = %e, url = %config.deluge.url, "Deluge Web UI not available yet");
        }

        let capabilities = host.detect_capabilities().await;
        let plugin = RatioPlugin::enable(
            store.clone(),
            host.clone(),
            capabilities.group_resolver(&host),
            &config.seed_policies,
        )
        .await
        .context("Failed to enable ratio policy")?;

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %ipc.socket_path().display(), "IPC server started");

        Ok(Self {
            plugin,
            host,
            ipc: Arc::new(ipc),
            store,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc = self.ipc.clone();
        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;
        let mut core_events = self.plugin.subscribe();

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                event = core_events.recv() => match event {
                    Ok(event) => Self::handle_core_event(&ipc, event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event forwarding fell behind");
                    }
                    Err(RecvError::Closed) => {
                        error!("Policy event channel closed");
                        break;
                    }
                },

                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        info!("Shutting down complexratiod");
        ipc.broadcast_event(Event::new(EventPayload::Shutdown));

        self.plugin.disable().await;

        if let Err(e) = self.store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
            warn!(error = %e, "Failed to log service shutdown");
        }

        ipc.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    fn handle_core_event(ipc: &Arc<IpcServer>, event: CoreEvent) {
        debug!(event = ?event, "Forwarding core event");
        ipc.broadcast_event(Event::new(EventPayload::from(event)));
    }

    async fn handle_ipc_message(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => match request.command {
                // These wait for any scan holding the engine, so they are
                // answered off the service loop
                command @ (Command::GetConfig | Command::SetConfig { .. }) => {
                    self.spawn_config_command(client_id, request.request_id, command);
                }
                command => {
                    let response = self.handle_command(&client_id, request.request_id, command);
                    let _ = self.ipc.send_response(&client_id, response).await;
                }
            },

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                let _ = self.store.append_audit(AuditEvent::new(AuditEventType::ClientConnected {
                    client_id: client_id.to_string(),
                    role: format!("{:?}", info.role),
                    uid: info.uid,
                }));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = self.store.append_audit(AuditEvent::new(
                    AuditEventType::ClientDisconnected {
                        client_id: client_id.to_string(),
                    },
                ));
            }
        }
    }

    fn spawn_config_command(&self, client_id: ClientId, request_id: u64, command: Command) {
        let policy = self.plugin.handle();
        let ipc = self.ipc.clone();

        tokio::spawn(async move {
            let role = ipc.get_client_info(&client_id).await.map(|info| info.role);
            let response = config_command(&policy, role, request_id, command).await;
            if let Err(e) = ipc.send_response(&client_id, response).await {
                debug!(client_id = %client_id, error = %e, "Client left before config reply");
            }
        });
    }

    fn handle_command(&self, client_id: &ClientId, request_id: u64, command: Command) -> Response {
        match command {
            Command::GetConfig | Command::SetConfig { .. } => Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::InvalidRequest, "Config commands are not handled here"),
            ),

            Command::GetHealth => {
                let health = HealthStatus {
                    live: true,
                    ready: self.plugin.is_running(),
                    plugin_enabled: true,
                    host_ok: self.host.is_healthy(),
                    store_ok: self.store.is_healthy(),
                    groups_available: self.plugin.groups_available(),
                };
                Response::success(request_id, ResponsePayload::Health(health))
            }

            Command::SubscribeEvents => Response::success(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
            ),

            Command::UnsubscribeEvents => {
                Response::success(request_id, ResponsePayload::Unsubscribed)
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }
}

/// Answer `get_config`/`set_config`; `set_config` needs the admin role
async fn config_command(
    policy: &PolicyHandle,
    role: Option<ClientRole>,
    request_id: u64,
    command: Command,
) -> Response {
    match command {
        Command::GetConfig => {
            let policies = policy.get_config().await;
            Response::success(request_id, ResponsePayload::Config { policies })
        }

        Command::SetConfig { update } => {
            if !role.is_some_and(|role| role.can_set_config()) {
                return Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::PermissionDenied, "Admin role required"),
                );
            }

            match policy.set_config(update).await {
                Ok(groups) => {
                    Response::success(request_id, ResponsePayload::ConfigUpdated { groups })
                }
                Err(e) => Response::error(request_id, error_info(&e)),
            }
        }

        other => Response::error(
            request_id,
            ErrorInfo::new(ErrorCode::InvalidRequest, format!("Not a config command: {:?}", other)),
        ),
    }
}

fn error_info(e: &RatioError) -> ErrorInfo {
    let code = match e {
        RatioError::ValidationError(_) => ErrorCode::ValidationFailed,
        RatioError::StoreError(_) => ErrorCode::StoreError,
    };
    ErrorInfo::new(code, e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "complexratiod starting");

    let service = Service::new(&args).await?;
    service.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use complexratio_api::{
        JobSnapshot, PolicyDocument, PolicyRecord, Request, ResponseResult, DEFAULT_GROUP,
    };
    use complexratio_host_api::{HostError, HostResult, MockHost};
    use complexratio_util::JobId;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    /// Job source whose listing blocks until released, holding the engine mid-scan
    #[derive(Default)]
    struct StalledHost {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl JobSource for StalledHost {
        async fn list_jobs(&self) -> HostResult<Vec<JobId>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Vec::new())
        }

        async fn get_status(&self, id: &JobId) -> HostResult<JobSnapshot> {
            Err(HostError::JobNotFound(id.clone()))
        }

        async fn pause(&self, id: &JobId) -> HostResult<()> {
            Err(HostError::JobNotFound(id.clone()))
        }
    }

    async fn service_with(jobs: Arc<dyn JobSource>, dir: &TempDir) -> Service {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let plugin = RatioPlugin::enable_with_period(
            store.clone(),
            jobs,
            None,
            &PolicyDocument::new(),
            Duration::from_secs(15),
        )
        .await
        .unwrap();

        let client =
            DelugeClient::new("http://127.0.0.1:9", "deluge", Duration::from_millis(500)).unwrap();

        Service {
            plugin,
            host: Arc::new(DelugeHost::new(client, None)),
            ipc: Arc::new(IpcServer::new(dir.path().join("complexratio.sock"))),
            store,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_request_does_not_wait_for_running_scan() {
        let dir = TempDir::new().unwrap();
        let host = Arc::new(StalledHost::default());
        let service = service_with(host.clone(), &dir).await;

        // First scan starts and holds the engine
        host.entered.notified().await;

        for command in [Command::GetConfig, Command::SetConfig { update: PolicyDocument::new() }] {
            let message = ServerMessage::Request {
                client_id: ClientId::new(),
                request: Request::new(1, command),
            };
            let handled =
                tokio::time::timeout(Duration::from_secs(1), service.handle_ipc_message(message));
            assert!(handled.await.is_ok(), "service loop blocked behind the scan");
        }

        host.release.notify_one();
        let policies = tokio::time::timeout(Duration::from_secs(1), service.plugin.get_config())
            .await
            .unwrap();
        assert!(policies.contains_key(DEFAULT_GROUP));

        service.plugin.disable().await;
    }

    #[tokio::test]
    async fn test_set_config_requires_admin_role() {
        let dir = TempDir::new().unwrap();
        let service = service_with(Arc::new(MockHost::new()), &dir).await;
        let policy = service.plugin.handle();

        let mut update = PolicyDocument::new();
        update.insert(DEFAULT_GROUP.into(), PolicyRecord::activated(2.0, 1.0, 10.0));

        for role in [None, Some(ClientRole::Observer)] {
            let command = Command::SetConfig {
                update: update.clone(),
            };
            let response = config_command(&policy, role, 7, command).await;
            match response.result {
                ResponseResult::Err(info) => assert_eq!(info.code, ErrorCode::PermissionDenied),
                other => panic!("unexpected result {:?}", other),
            }
        }
        assert!(!policy.get_config().await[DEFAULT_GROUP].activated);

        let command = Command::SetConfig { update };
        let response = config_command(&policy, Some(ClientRole::Admin), 8, command).await;
        assert_eq!(response.request_id, 8);
        assert!(matches!(
            response.result,
            ResponseResult::Ok(ResponsePayload::ConfigUpdated { .. })
        ));
        assert!(policy.get_config().await[DEFAULT_GROUP].activated);

        service.plugin.disable().await;
    }

    #[tokio::test]
    async fn test_invalid_update_maps_to_validation_failed() {
        let dir = TempDir::new().unwrap();
        let service = service_with(Arc::new(MockHost::new()), &dir).await;

        let mut update = PolicyDocument::new();
        update.insert(DEFAULT_GROUP.into(), PolicyRecord::activated(-1.0, 1.0, 10.0));
        let command = Command::SetConfig { update };
        let response =
            config_command(&service.plugin.handle(), Some(ClientRole::Admin), 3, command).await;

        match response.result {
            ResponseResult::Err(info) => assert_eq!(info.code, ErrorCode::ValidationFailed),
            other => panic!("unexpected result {:?}", other),
        }

        service.plugin.disable().await;
    }
}
