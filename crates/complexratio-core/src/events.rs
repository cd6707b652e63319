//! Core events emitted by the engine

use complexratio_api::{EventPayload, StopReason};
use complexratio_util::JobId;

/// Events emitted by the core engine
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A job was paused by policy
    JobStopped {
        job_id: JobId,
        name: String,
        group: String,
        reason: StopReason,
        ratio: f64,
        seeding_hours: f64,
    },

    /// A group got a default policy record
    GroupCreated { group: String },

    /// Groups were changed through the config API
    ConfigUpdated { groups: Vec<String> },
}

impl From<CoreEvent> for EventPayload {
    fn from(event: CoreEvent) -> Self {
        match event {
            CoreEvent::JobStopped {
                job_id,
                name,
                group,
                reason,
                ratio,
                seeding_hours,
            } => EventPayload::JobStopped {
                job_id,
                name,
                group,
                reason,
                ratio,
                seeding_hours,
            },
            CoreEvent::GroupCreated { group } => EventPayload::GroupCreated { group },
            CoreEvent::ConfigUpdated { groups } => EventPayload::ConfigUpdated { groups },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_event_keeps_details() {
        let payload = EventPayload::from(CoreEvent::JobStopped {
            job_id: JobId::new("abc"),
            name: "debian.iso".into(),
            group: "linux".into(),
            reason: StopReason::ForceStop,
            ratio: 0.4,
            seeding_hours: 200.0,
        });

        match payload {
            EventPayload::JobStopped { job_id, reason, group, .. } => {
                assert_eq!(job_id.as_str(), "abc");
                assert_eq!(reason, StopReason::ForceStop);
                assert_eq!(group, "linux");
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
