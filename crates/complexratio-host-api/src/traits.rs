//! Host adapter traits

use async_trait::async_trait;
use complexratio_api::JobSnapshot;
use complexratio_util::JobId;
use thiserror::Error;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Pause failed: {0}")]
    PauseFailed(String),

    #[error("Not authenticated with host")]
    NotAuthenticated,

    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("Unexpected response: {0}")]
    Protocol(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Supplies the managed jobs and lets the core pause them
#[async_trait]
pub trait JobSource: Send + Sync {
    /// List the IDs of every job the host currently manages
    async fn list_jobs(&self) -> HostResult<Vec<JobId>>;

    /// Fetch a fresh status snapshot for one job
    async fn get_status(&self, id: &JobId) -> HostResult<JobSnapshot>;

    /// Pause a job
    async fn pause(&self, id: &JobId) -> HostResult<()>;

    /// Optional: check if the host connection is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Supplies the group names (labels) known to the host
#[async_trait]
pub trait GroupResolver: Send + Sync {
    async fn list_groups(&self) -> HostResult<Vec<String>>;
}
