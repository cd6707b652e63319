//! Mock host adapter for testing

use async_trait::async_trait;
use complexratio_api::JobSnapshot;
use complexratio_util::JobId;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::{GroupResolver, HostError, HostResult, JobSource};

/// In-memory host for unit/integration testing
///
/// Jobs are listed in ID order. Pausing a job records the call and flips the
/// job's paused flag, as a real client would.
pub struct MockHost {
    jobs: Mutex<BTreeMap<JobId, JobSnapshot>>,
    groups: Mutex<Vec<String>>,
    pause_calls: Mutex<Vec<JobId>>,

    /// Jobs whose status fetch fails
    pub fail_status: Mutex<HashSet<JobId>>,

    /// Jobs whose pause fails
    pub fail_pause: Mutex<HashSet<JobId>>,

    /// Make `list_jobs` fail
    pub fail_list: Mutex<bool>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(BTreeMap::new()),
            groups: Mutex::new(Vec::new()),
            pause_calls: Mutex::new(Vec::new()),
            fail_status: Mutex::new(HashSet::new()),
            fail_pause: Mutex::new(HashSet::new()),
            fail_list: Mutex::new(false),
        }
    }

    /// Build a seeding, unpaused job snapshot
    pub fn seeding_job(id: &str, group: &str, seeding_time: f64, ratio: f64) -> JobSnapshot {
        JobSnapshot {
            id: JobId::new(id),
            name: format!("{}.torrent", id),
            is_seed: true,
            is_paused: false,
            seeding_time,
            active_time: seeding_time,
            ratio,
            state: "Seeding".into(),
            group: group.into(),
        }
    }

    pub fn add_job(&self, job: JobSnapshot) {
        self.jobs.lock().unwrap().insert(job.id.clone(), job);
    }

    pub fn set_groups(&self, groups: &[&str]) {
        *self.groups.lock().unwrap() = groups.iter().map(|g| g.to_string()).collect();
    }

    /// Every successful pause, in call order
    pub fn pause_calls(&self) -> Vec<JobId> {
        self.pause_calls.lock().unwrap().clone()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobSource for MockHost {
    async fn list_jobs(&self) -> HostResult<Vec<JobId>> {
        if *self.fail_list.lock().unwrap() {
            return Err(HostError::Unreachable("Mock list failure".into()));
        }
        Ok(self.jobs.lock().unwrap().keys().cloned().collect())
    }

    async fn get_status(&self, id: &JobId) -> HostResult<JobSnapshot> {
        if self.fail_status.lock().unwrap().contains(id) {
            return Err(HostError::Protocol("Mock status failure".into()));
        }
        self.jobs
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| HostError::JobNotFound(id.clone()))
    }

    async fn pause(&self, id: &JobId) -> HostResult<()> {
        if self.fail_pause.lock().unwrap().contains(id) {
            return Err(HostError::PauseFailed("Mock pause failure".into()));
        }

        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| HostError::JobNotFound(id.clone()))?;
        job.is_paused = true;
        job.state = "Paused".into();

        self.pause_calls.lock().unwrap().push(id.clone());
        Ok(())
    }
}

#[async_trait]
impl GroupResolver for MockHost {
    async fn list_groups(&self) -> HostResult<Vec<String>> {
        Ok(self.groups.lock().unwrap().clone())
    }
}
