//! Core policy engine

use complexratio_api::{JobSnapshot, PolicyDocument, PolicyRecord};
use complexratio_config::validate_policy_document;
use complexratio_host_api::{GroupResolver, HostResult, JobSource};
use complexratio_store::{AuditEvent, AuditEventType, ConfigStore, Store};
use complexratio_util::{RatioError, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{evaluate, CoreEvent, Decision};

/// The core policy engine
///
/// Owns the in-memory policy mapping and scans every job on each tick.
pub struct PolicyEngine {
    config: ConfigStore,
    store: Arc<dyn Store>,
    jobs: Arc<dyn JobSource>,
}

impl PolicyEngine {
    /// Create a new policy engine
    pub fn new(config: ConfigStore, store: Arc<dyn Store>, jobs: Arc<dyn JobSource>) -> Self {
        info!(group_count = config.len(), "Policy engine initialized");

        Self {
            config,
            store,
            jobs,
        }
    }

    /// Make sure every group the host knows about has a record.
    ///
    /// Missing groups get the default (inactive) record. The mapping is
    /// persisted once for the whole batch.
    pub async fn bootstrap_groups(&mut self, resolver: &dyn GroupResolver) -> Vec<CoreEvent> {
        let groups = match resolver.list_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(error = %e, "Failed to list host groups, skipping bootstrap");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        for group in groups.iter().filter(|g| !g.is_empty()) {
            let (_, created) = self.config.ensure_group(group);
            if created {
                events.push(self.group_created(group));
            }
        }

        if !groups.is_empty() {
            self.persist("group bootstrap");
        }

        debug!(
            reported = groups.len(),
            created = events.len(),
            "Group bootstrap complete"
        );
        events
    }

    /// Scan every job once and pause those that exceed their group's limits.
    ///
    /// Failing to list jobs fails the whole tick. Failures for a single job
    /// are logged and the scan moves on to the next one.
    pub async fn tick(&mut self) -> HostResult<Vec<CoreEvent>> {
        let ids = self.jobs.list_jobs().await?;
        let mut events = Vec::new();

        for id in &ids {
            let job = match self.jobs.get_status(id).await {
                Ok(job) => job,
                Err(e) => {
                    warn!(job_id = %id, error = %e, "Failed to read job status, skipping");
                    continue;
                }
            };

            if !job.is_active_seed() {
                continue;
            }

            events.extend(self.evaluate_job(&job).await);
        }

        debug!(jobs = ids.len(), events = events.len(), "Tick complete");
        Ok(events)
    }

    async fn evaluate_job(&mut self, job: &JobSnapshot) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        let group = job.group_name().to_string();

        let (record, created) = self.config.ensure_group(&group);
        if created {
            events.push(self.group_created(&group));
            self.persist("new group");
        }

        let seeding_hours = job.seeding_hours();
        let reason = match evaluate(&record, seeding_hours, job.ratio) {
            Decision::Deactivated => {
                debug!(job_id = %job.id, group = %group, "Policy not activated for group");
                return events;
            }
            Decision::Keep => {
                debug!(
                    job_id = %job.id,
                    group = %group,
                    ratio = job.ratio,
                    seeding_hours,
                    "Job within policy limits"
                );
                return events;
            }
            Decision::Stop(reason) => reason,
        };

        if let Err(e) = self.jobs.pause(&job.id).await {
            warn!(job_id = %job.id, reason = %reason, error = %e, "Failed to pause job");
            return events;
        }

        info!(
            job_id = %job.id,
            name = %job.name,
            group = %group,
            reason = %reason,
            ratio = job.ratio,
            seeding_hours,
            "Job stopped by policy"
        );

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::JobStopped {
            job_id: job.id.clone(),
            name: job.name.clone(),
            group: group.clone(),
            reason,
            ratio: job.ratio,
            seeding_hours,
        }));

        events.push(CoreEvent::JobStopped {
            job_id: job.id.clone(),
            name: job.name.clone(),
            group,
            reason,
            ratio: job.ratio,
            seeding_hours,
        });
        events
    }

    /// Current group -> record mapping
    pub fn get_config(&self) -> PolicyDocument {
        self.config.snapshot()
    }

    pub fn policy(&self, group: &str) -> Option<PolicyRecord> {
        self.config.get(group).copied()
    }

    /// Overwrite the records for every group in `update` and persist once.
    ///
    /// The whole update is rejected if any record is invalid. A persistence
    /// failure is returned to the caller; the in-memory mapping keeps the
    /// update and is written again on the next successful save.
    pub fn set_config(&mut self, update: PolicyDocument) -> Result<Vec<String>> {
        let errors = validate_policy_document(&update);
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RatioError::validation(message));
        }

        let groups = self.config.set(update);
        self.config.save().map_err(|e| {
            error!(error = %e, "Failed to persist policy update");
            RatioError::store(e.to_string())
        })?;

        info!(groups = ?groups, "Policy records updated");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::ConfigUpdated {
            groups: groups.clone(),
        }));

        Ok(groups)
    }

    pub fn group_count(&self) -> usize {
        self.config.len()
    }

    fn group_created(&self, group: &str) -> CoreEvent {
        info!(group, "Created default policy for group");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::GroupCreated {
            group: group.to_string(),
        }));
        CoreEvent::GroupCreated {
            group: group.to_string(),
        }
    }

    fn persist(&self, context: &'static str) -> bool {
        match self.config.save() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, context, "Failed to persist policy document");
                false
            }
        }
    }
}
