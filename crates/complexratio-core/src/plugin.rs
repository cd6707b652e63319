//! Enable/disable lifecycle around the policy engine

use complexratio_api::PolicyDocument;
use complexratio_host_api::{GroupResolver, HostError, JobSource};
use complexratio_store::{AuditEvent, AuditEventType, ConfigStore, Store};
use complexratio_util::{RatioError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{CoreEvent, PolicyEngine, Scheduler, TICK_PERIOD};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Shared access to a running plugin's policy mapping.
///
/// Goes through the same engine mutex as the scheduled scans, so callers wait
/// for a scan in progress. Cheap to clone into request tasks.
#[derive(Clone)]
pub struct PolicyHandle {
    engine: Arc<Mutex<PolicyEngine>>,
    events: broadcast::Sender<CoreEvent>,
}

impl PolicyHandle {
    /// Current group -> record mapping
    pub async fn get_config(&self) -> PolicyDocument {
        self.engine.lock().await.get_config()
    }

    /// Merge `update` into the mapping and persist it
    pub async fn set_config(&self, update: PolicyDocument) -> Result<Vec<String>> {
        let groups = self.engine.lock().await.set_config(update)?;
        let _ = self.events.send(CoreEvent::ConfigUpdated {
            groups: groups.clone(),
        });
        Ok(groups)
    }
}

/// A running instance of the stop policy.
///
/// Created by [`RatioPlugin::enable`] and torn down by
/// [`RatioPlugin::disable`]. Ticks and config calls share the engine through
/// one mutex, so a config update never lands in the middle of a scan.
pub struct RatioPlugin {
    engine: Arc<Mutex<PolicyEngine>>,
    store: Arc<dyn Store>,
    scheduler: Scheduler,
    events: broadcast::Sender<CoreEvent>,
    groups_available: bool,
}

impl RatioPlugin {
    /// Load policies, bootstrap groups and start scanning every [`TICK_PERIOD`]
    pub async fn enable(
        store: Arc<dyn Store>,
        jobs: Arc<dyn JobSource>,
        groups: Option<Arc<dyn GroupResolver>>,
        seed_policies: &PolicyDocument,
    ) -> Result<Self> {
        Self::enable_with_period(store, jobs, groups, seed_policies, TICK_PERIOD).await
    }

    /// Same as [`RatioPlugin::enable`] with a custom scan period
    pub async fn enable_with_period(
        store: Arc<dyn Store>,
        jobs: Arc<dyn JobSource>,
        groups: Option<Arc<dyn GroupResolver>>,
        seed_policies: &PolicyDocument,
        period: Duration,
    ) -> Result<Self> {
        let config = ConfigStore::load_seeded(store.clone(), seed_policies)
            .map_err(|e| RatioError::store(e.to_string()))?;
        let mut engine = PolicyEngine::new(config, store.clone(), jobs);

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let groups_available = groups.is_some();
        match &groups {
            Some(resolver) => {
                for event in engine.bootstrap_groups(resolver.as_ref()).await {
                    let _ = events.send(event);
                }
            }
            None => info!("Host has no group facility, every job uses the default policy"),
        }

        let group_count = engine.group_count();
        let engine = Arc::new(Mutex::new(engine));

        let scheduler = {
            let engine = engine.clone();
            let events = events.clone();
            Scheduler::start(period, move || {
                let engine = engine.clone();
                let events = events.clone();
                async move {
                    let produced = engine.lock().await.tick().await?;
                    for event in produced {
                        let _ = events.send(event);
                    }
                    Ok::<(), HostError>(())
                }
            })
        };

        let _ = store.append_audit(AuditEvent::new(AuditEventType::PluginEnabled {
            group_count,
            groups_available,
        }));
        info!(
            group_count,
            groups_available,
            period_secs = scheduler.period().as_secs(),
            "Ratio policy enabled"
        );

        Ok(Self {
            engine,
            store,
            scheduler,
            events,
            groups_available,
        })
    }

    /// Stop the scheduler. The in-memory mapping is dropped with the plugin.
    pub async fn disable(mut self) {
        if !self.scheduler.stop().await {
            warn!("Disabled while a scan was still running");
        }

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::PluginDisabled));
        info!("Ratio policy disabled");
    }

    /// Handle for config calls made outside the plugin's owner
    pub fn handle(&self) -> PolicyHandle {
        PolicyHandle {
            engine: self.engine.clone(),
            events: self.events.clone(),
        }
    }

    /// Current group -> record mapping
    pub async fn get_config(&self) -> PolicyDocument {
        self.handle().get_config().await
    }

    /// Merge `update` into the mapping and persist it
    pub async fn set_config(&self, update: PolicyDocument) -> Result<Vec<String>> {
        self.handle().set_config(update).await
    }

    /// Subscribe to engine events (stops, group creation, config updates)
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn groups_available(&self) -> bool {
        self.groups_available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use complexratio_api::{PolicyRecord, StopReason, DEFAULT_GROUP};
    use complexratio_host_api::MockHost;
    use complexratio_store::SqliteStore;
    use complexratio_util::JobId;

    fn setup() -> (Arc<dyn Store>, Arc<MockHost>) {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        (store, Arc::new(MockHost::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn enable_bootstraps_groups_and_persists() {
        let (store, host) = setup();
        host.set_groups(&["movies", "tv"]);
        let resolver: Arc<dyn GroupResolver> = host.clone();

        let plugin =
            RatioPlugin::enable(store.clone(), host.clone(), Some(resolver), &PolicyDocument::new())
                .await
                .unwrap();

        let config = plugin.get_config().await;
        assert_eq!(config.len(), 3);
        assert!(plugin.groups_available());
        assert_eq!(store.load_policies().unwrap().unwrap(), config);

        plugin.disable().await;
    }

    #[tokio::test(start_paused = true)]
    async fn enable_without_groups_uses_default_only() {
        let (store, host) = setup();
        host.set_groups(&["movies"]);

        let plugin = RatioPlugin::enable(store, host, None, &PolicyDocument::new())
            .await
            .unwrap();

        let config = plugin.get_config().await;
        assert_eq!(config.len(), 1);
        assert!(config.contains_key(DEFAULT_GROUP));
        assert!(!plugin.groups_available());

        plugin.disable().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_scan_stops_job_and_reports_it() {
        let (store, host) = setup();
        host.add_job(MockHost::seeding_job("a", "", 36001.0, 1.5));

        let plugin = RatioPlugin::enable(store, host.clone(), None, &PolicyDocument::new())
            .await
            .unwrap();
        let mut rx = plugin.subscribe();

        let mut update = PolicyDocument::new();
        update.insert(DEFAULT_GROUP.into(), PolicyRecord::activated(1.0, 10.0, 100.0));
        plugin.set_config(update).await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), CoreEvent::ConfigUpdated { .. }));
        // Auto-advances the paused clock to the first tick
        match rx.recv().await.unwrap() {
            CoreEvent::JobStopped { job_id, reason, .. } => {
                assert_eq!(job_id, JobId::new("a"));
                assert_eq!(reason, StopReason::Ratio);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(host.pause_calls(), vec![JobId::new("a")]);

        plugin.disable().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_scans_after_disable() {
        let (store, host) = setup();
        let plugin = RatioPlugin::enable(store, host.clone(), None, &PolicyDocument::new())
            .await
            .unwrap();

        let mut update = PolicyDocument::new();
        update.insert(DEFAULT_GROUP.into(), PolicyRecord::activated(0.0, 0.0, 0.0));
        plugin.set_config(update).await.unwrap();
        plugin.disable().await;

        host.add_job(MockHost::seeding_job("late", "", 1.0e6, 10.0));
        tokio::time::sleep(TICK_PERIOD * 4).await;
        assert!(host.pause_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn seeds_apply_only_to_new_groups() {
        let (store, host) = setup();
        let mut stored = PolicyDocument::new();
        stored.insert(DEFAULT_GROUP.into(), PolicyRecord::activated(5.0, 5.0, 5.0));
        store.save_policies(&stored).unwrap();

        let mut seeds = PolicyDocument::new();
        seeds.insert(DEFAULT_GROUP.into(), PolicyRecord::default());
        seeds.insert("books".into(), PolicyRecord::activated(1.0, 2.0, 3.0));

        let plugin = RatioPlugin::enable(store, host, None, &seeds).await.unwrap();

        let config = plugin.get_config().await;
        assert_eq!(config[DEFAULT_GROUP], PolicyRecord::activated(5.0, 5.0, 5.0));
        assert_eq!(config["books"], PolicyRecord::activated(1.0, 2.0, 3.0));

        plugin.disable().await;
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_update_is_rejected_without_event() {
        let (store, host) = setup();
        let plugin = RatioPlugin::enable(store, host, None, &PolicyDocument::new())
            .await
            .unwrap();
        let mut rx = plugin.subscribe();

        let mut update = PolicyDocument::new();
        update.insert("tv".into(), PolicyRecord::activated(f64::NAN, 1.0, 1.0));

        assert!(plugin.set_config(update).await.is_err());
        assert!(rx.try_recv().is_err());

        plugin.disable().await;
    }
}
