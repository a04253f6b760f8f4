//! Periodic refresh of dashboard data.
//!
//! A [`PeriodicTask`] runs its job once immediately and then on every
//! period. The job is awaited inside the timer loop, so a slow run delays
//! the next one instead of overlapping it; ticks missed meanwhile are
//! skipped. Dropping the task stops it.

use std::future::Future;
use std::time::Duration;

use log::{debug, info};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::DashboardConfig;

/// A background job repeated at a fixed period.
pub struct PeriodicTask {
    name: String,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `job` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero or if called outside a tokio runtime.
    pub fn spawn<F, Fut>(name: &str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut runs: u64 = 0;
            loop {
                ticker.tick().await;
                runs += 1;
                debug!("[Scheduler] {} run #{}", task_name, runs);
                job().await;
            }
        });

        info!("[Scheduler] Started {} every {:?}", name, period);
        Self {
            name: name.to_string(),
            handle,
        }
    }

    /// Refresh recommendations at the configured period.
    pub fn recommendations<F, Fut>(config: &DashboardConfig, job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(
            "recommendations",
            Duration::from_secs(config.recommendation_refresh_secs.max(1)),
            job,
        )
    }

    /// Refresh trip counts at the configured period.
    pub fn trip_counts<F, Fut>(config: &DashboardConfig, job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(
            "trip counts",
            Duration::from_secs(config.counts_refresh_secs.max(1)),
            job,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the task. A run in progress is abandoned at its next await.
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            info!("[Scheduler] Cancelled {}", self.name);
        }
        self.handle.abort();
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn counting_task(period: Duration) -> (PeriodicTask, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = PeriodicTask::spawn("counter", period, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (task, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_period() {
        let (task, runs) = counting_task(Duration::from_secs(10));

        sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(34)).await;
        // 0s, 10s, 20s, 30s
        assert_eq!(runs.load(Ordering::SeqCst), 4);
        assert!(task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_runs_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        let (a, m, r) = (active.clone(), max_active.clone(), runs.clone());
        let _task = PeriodicTask::spawn("slow", Duration::from_secs(10), move || {
            let (a, m, r) = (a.clone(), m.clone(), r.clone());
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_secs(25)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                r.fetch_add(1, Ordering::SeqCst);
            }
        });

        sleep(Duration::from_secs(100)).await;
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        let completed = runs.load(Ordering::SeqCst);
        assert!(completed >= 2 && completed <= 4, "completed {}", completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_runs() {
        let (task, runs) = counting_task(Duration::from_secs(10));
        sleep(Duration::from_secs(15)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        task.cancel();
        sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_runs() {
        let (task, runs) = counting_task(Duration::from_secs(10));
        sleep(Duration::from_secs(5)).await;
        drop(task);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_periods() {
        let config = DashboardConfig {
            counts_refresh_secs: 10,
            ..Default::default()
        };
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = PeriodicTask::trip_counts(&config, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(task.name(), "trip counts");

        sleep(Duration::from_secs(25)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
