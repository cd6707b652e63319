//! Host capabilities model

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::GroupResolver;

/// Describes what a host can do beyond listing and pausing jobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// The host's grouping subsystem (e.g. the Deluge Label plugin) is enabled
    pub groups_enabled: bool,
}

impl HostCapabilities {
    /// Jobs only; every job falls into the default group unless it reports one
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn with_groups() -> Self {
        Self {
            groups_enabled: true,
        }
    }

    /// Hand out the host as a group resolver only when grouping is enabled.
    ///
    /// Absence is the normal state for hosts without a grouping subsystem.
    pub fn group_resolver<H>(&self, host: &Arc<H>) -> Option<Arc<dyn GroupResolver>>
    where
        H: GroupResolver + 'static,
    {
        if self.groups_enabled {
            Some(host.clone() as Arc<dyn GroupResolver>)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockHost;

    #[test]
    fn minimal_has_no_resolver() {
        let host = Arc::new(MockHost::new());
        assert!(HostCapabilities::minimal().group_resolver(&host).is_none());
    }

    #[test]
    fn groups_enabled_exposes_resolver() {
        let host = Arc::new(MockHost::new());
        assert!(HostCapabilities::with_groups().group_resolver(&host).is_some());
    }
}
