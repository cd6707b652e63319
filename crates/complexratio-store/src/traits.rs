//! Store trait definitions

use complexratio_api::PolicyDocument;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Policy document

    /// Load the persisted policy document, if one was ever saved
    fn load_policies(&self) -> StoreResult<Option<PolicyDocument>>;

    /// Replace the persisted policy document
    fn save_policies(&self, policies: &PolicyDocument) -> StoreResult<()>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
