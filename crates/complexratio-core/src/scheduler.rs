//! Fixed-period tick scheduler

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

/// Period between policy scans
pub const TICK_PERIOD: Duration = Duration::from_secs(15);

/// How long `stop` waits for an in-progress tick
pub const STOP_GRACE: Duration = Duration::from_secs(5);

/// Runs a callback on a fixed period until stopped.
///
/// The first run happens one full period after start. Ticks never overlap:
/// a tick that overruns the period causes the missed ticks to be skipped.
/// A failing or panicking tick is logged and does not end the schedule.
pub struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl Scheduler {
    /// Spawn the scheduling loop on the current runtime
    pub fn start<F, Fut, E>(period: Duration, mut callback: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            debug!("Scheduler shutting down");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        // Run on its own task so a panic stays contained
                        match tokio::spawn(callback()).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => warn!(error = %e, "Scheduled tick failed"),
                            Err(e) if e.is_panic() => error!("Scheduled tick panicked"),
                            Err(e) => warn!(error = %e, "Scheduled tick was cancelled"),
                        }
                    }
                }
            }
        });

        debug!(period_secs = period.as_secs_f64(), "Scheduler started");

        Self {
            shutdown_tx,
            handle: Some(handle),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop scheduling further ticks.
    ///
    /// Waits up to [`STOP_GRACE`] for an in-progress tick to finish. No new
    /// tick starts once this returns, even when the wait timed out.
    /// Returns false if the wait timed out.
    pub async fn stop(&mut self) -> bool {
        let _ = self.shutdown_tx.send(true);

        let Some(handle) = self.handle.take() else {
            return true;
        };

        match tokio::time::timeout(STOP_GRACE, handle).await {
            Ok(_) => {
                debug!("Scheduler stopped");
                true
            }
            Err(_) => {
                warn!(
                    grace_secs = STOP_GRACE.as_secs(),
                    "Tick still running after stop, letting it finish in the background"
                );
                false
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Scheduler whose ticks report their start time on a channel
    fn recording(
        period: Duration,
        tick_duration: Duration,
    ) -> (Scheduler, mpsc::UnboundedReceiver<Instant>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::start(period, move || {
            let tx = tx.clone();
            async move {
                let _ = tx.send(Instant::now());
                tokio::time::sleep(tick_duration).await;
                Ok::<(), String>(())
            }
        });
        (scheduler, rx)
    }

    /// Timer deadlines are rounded up to the next millisecond
    fn assert_elapsed(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(5),
            "expected about {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let start = Instant::now();
        let (mut scheduler, mut rx) = recording(TICK_PERIOD, Duration::ZERO);

        let first = rx.recv().await.unwrap();
        assert_elapsed(first - start, TICK_PERIOD);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_keep_a_fixed_period() {
        let start = Instant::now();
        let (mut scheduler, mut rx) = recording(TICK_PERIOD, Duration::from_secs(5));

        for n in 1..=3u32 {
            let at = rx.recv().await.unwrap();
            assert_elapsed(at - start, TICK_PERIOD * n);
        }

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop() {
        let (mut scheduler, mut rx) = recording(TICK_PERIOD, Duration::ZERO);
        rx.recv().await.unwrap();

        assert!(scheduler.stop().await);
        assert!(!scheduler.is_running());

        tokio::time::sleep(TICK_PERIOD * 10).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_first_tick() {
        let (mut scheduler, mut rx) = recording(TICK_PERIOD, Duration::ZERO);

        assert!(scheduler.stop().await);

        tokio::time::sleep(TICK_PERIOD * 4).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_with_long_tick_is_bounded() {
        let (mut scheduler, mut rx) = recording(TICK_PERIOD, Duration::from_secs(60));
        rx.recv().await.unwrap();

        let before = Instant::now();
        assert!(!scheduler.stop().await);
        assert_elapsed(Instant::now() - before, STOP_GRACE);

        // The running tick finishes but no new one starts
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_tick_does_not_end_schedule() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let counter = calls.clone();
        let mut scheduler = Scheduler::start(TICK_PERIOD, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let tx = tx.clone();
            async move {
                let _ = tx.send(n);
                if n == 0 {
                    Err("host unreachable".to_string())
                } else {
                    Ok(())
                }
            }
        });

        assert_eq!(rx.recv().await, Some(0));
        assert_eq!(rx.recv().await, Some(1));
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_tick_does_not_end_schedule() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let counter = calls.clone();
        let mut scheduler = Scheduler::start(TICK_PERIOD, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let tx = tx.clone();
            async move {
                let _ = tx.send(n);
                if n == 0 {
                    panic!("boom");
                }
                Ok::<(), String>(())
            }
        });

        assert_eq!(rx.recv().await, Some(0));
        assert_eq!(rx.recv().await, Some(1));
        scheduler.stop().await;
    }
}
