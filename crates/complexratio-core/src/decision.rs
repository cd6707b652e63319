//! Stop decision for a single job

use complexratio_api::{PolicyRecord, StopReason};

/// Outcome of evaluating an eligible job against its group's record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Enforcement is turned off for the group
    Deactivated,
    /// No threshold exceeded
    Keep,
    /// Pause the job
    Stop(StopReason),
}

/// Decide whether a seeding job must be stopped.
///
/// The ratio condition is checked before the force-stop ceiling and the first
/// match wins. Both comparisons are strict, so equality never stops a job.
pub fn evaluate(record: &PolicyRecord, seeding_hours: f64, ratio: f64) -> Decision {
    if !record.activated {
        return Decision::Deactivated;
    }

    if seeding_hours > record.time_threshold && ratio > record.ratio_threshold {
        Decision::Stop(StopReason::Ratio)
    } else if seeding_hours > record.force_stop_threshold {
        Decision::Stop(StopReason::ForceStop)
    } else {
        Decision::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ratio: f64, time: f64, force_stop: f64) -> PolicyRecord {
        PolicyRecord::activated(ratio, time, force_stop)
    }

    #[test]
    fn test_deactivated_ignores_thresholds() {
        let mut r = record(0.0, 0.0, 0.0);
        r.activated = false;
        assert_eq!(evaluate(&r, 1000.0, 1000.0), Decision::Deactivated);
    }

    #[test]
    fn test_ratio_stop() {
        assert_eq!(
            evaluate(&record(1.0, 10.0, 100.0), 36001.0 / 3600.0, 1.5),
            Decision::Stop(StopReason::Ratio)
        );
    }

    #[test]
    fn test_force_stop_without_ratio() {
        assert_eq!(
            evaluate(&record(2.0, 10.0, 5.0), 6.0, 0.1),
            Decision::Stop(StopReason::ForceStop)
        );
    }

    #[test]
    fn test_ratio_wins_when_both_match() {
        assert_eq!(
            evaluate(&record(1.0, 1.0, 2.0), 3.0, 5.0),
            Decision::Stop(StopReason::Ratio)
        );
    }

    #[test]
    fn test_equality_never_stops() {
        // Exactly at every threshold
        assert_eq!(evaluate(&record(1.0, 10.0, 10.0), 10.0, 1.0), Decision::Keep);
        // Time exceeded, ratio exactly at threshold, below force stop
        assert_eq!(evaluate(&record(1.0, 10.0, 20.0), 11.0, 1.0), Decision::Keep);
    }

    #[test]
    fn test_ratio_met_but_time_not() {
        assert_eq!(evaluate(&record(1.0, 10.0, 20.0), 9.0, 3.0), Decision::Keep);
    }

    #[test]
    fn test_zero_force_stop_is_a_ceiling_of_zero_hours() {
        // A zero ceiling stops any job that has seeded at all
        assert_eq!(
            evaluate(&record(5.0, 10.0, 0.0), 0.01, 0.0),
            Decision::Stop(StopReason::ForceStop)
        );
        assert_eq!(evaluate(&record(5.0, 10.0, 0.0), 0.0, 0.0), Decision::Keep);
    }
}
