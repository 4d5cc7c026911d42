//! The scheduled-run job: hourly uniqueness, bounded retry, attempt timeout.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::core::{BatchSummary, NotificationScheduler, SchedulerError};
use crate::store::SubscriptionStore;

/// Fixed prefix of the per-hour run uniqueness key.
pub const RUN_KEY_PREFIX: &str = "process-scheduled-notifications";

/// Total attempts before the job fails terminally.
const MAX_ATTEMPTS: u32 = 3;

/// Upper bound on a single attempt. Bounds the blast radius of a hung send
/// and frees the hourly slot for the next run.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Uniqueness key for the calendar hour containing `now`, e.g.
/// `process-scheduled-notifications-2026-01-05-08`. Stable within the hour,
/// different across hours.
pub fn run_key(now: DateTime<Utc>) -> String {
    format!("{}-{}", RUN_KEY_PREFIX, now.format("%Y-%m-%d-%H"))
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("a run is already in flight for key '{0}'")]
    AlreadyRunning(String),

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// In-process registry of active run keys with test-and-set acquisition.
///
/// The guard releases its key on drop, so a panicking or cancelled run
/// frees the hour's slot.
#[derive(Default)]
pub struct RunLockRegistry {
    active: Mutex<HashSet<String>>,
}

impl RunLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `key` if no holder exists. Returns `None` while another
    /// holder is alive.
    pub fn try_acquire(self: &Arc<Self>, key: &str) -> Option<RunLockGuard> {
        let mut active = self.active.lock().expect("run lock registry poisoned");
        if !active.insert(key.to_string()) {
            return None;
        }
        Some(RunLockGuard {
            registry: Arc::clone(self),
            key: key.to_string(),
        })
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.active
            .lock()
            .expect("run lock registry poisoned")
            .contains(key)
    }
}

/// Releases the held run key when dropped.
pub struct RunLockGuard {
    registry: Arc<RunLockRegistry>,
    key: String,
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        self.registry
            .active
            .lock()
            .expect("run lock registry poisoned")
            .remove(&self.key);
    }
}

/// The recurring unit of work wrapping [`NotificationScheduler::process_pending`].
///
/// There is no durable record of which sends succeeded, so a retry of a
/// partially-completed attempt may re-deliver to users whose send already
/// went out. Accepted tradeoff at hourly cadence.
pub struct ScheduledRunJob {
    scheduler: Arc<NotificationScheduler>,
    store: Arc<dyn SubscriptionStore>,
    max_attempts: u32,
    attempt_timeout: Duration,
}

impl ScheduledRunJob {
    pub fn new(scheduler: Arc<NotificationScheduler>, store: Arc<dyn SubscriptionStore>) -> Self {
        Self {
            scheduler,
            store,
            max_attempts: MAX_ATTEMPTS,
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }

    /// Override the retry budget and attempt timeout. Test hook.
    pub fn with_policy(mut self, max_attempts: u32, attempt_timeout: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Run the notification pass with retry. Each attempt re-evaluates the
    /// full subscription set against the same `now`; each is bounded by the
    /// attempt timeout. After the final failed attempt the error is logged
    /// terminally and returned.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<BatchSummary, JobError> {
        let key = run_key(now);
        let mut last_error = JobError::Timeout(self.attempt_timeout);

        for attempt in 1..=self.max_attempts {
            let pass = self.scheduler.process_pending(self.store.as_ref(), now);
            match tokio::time::timeout(self.attempt_timeout, pass).await {
                Ok(Ok(summary)) => {
                    info!(run_key = %key, attempt, sent = summary.sent, "scheduled run complete");
                    return Ok(summary);
                }
                Ok(Err(e)) => {
                    warn!(
                        run_key = %key,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "scheduled run attempt failed"
                    );
                    last_error = e.into();
                }
                Err(_) => {
                    warn!(
                        run_key = %key,
                        attempt,
                        max_attempts = self.max_attempts,
                        timeout_secs = self.attempt_timeout.as_secs(),
                        "scheduled run attempt timed out"
                    );
                    last_error = JobError::Timeout(self.attempt_timeout);
                }
            }
        }

        error!(
            run_key = %key,
            attempts = self.max_attempts,
            error = %last_error,
            "scheduled run failed terminally — giving up until next tick"
        );
        Err(last_error)
    }

    /// [`execute`](Self::execute) guarded by the hour's uniqueness key:
    /// refuses to start while a run for the same key is in flight.
    pub async fn execute_locked(
        &self,
        locks: &Arc<RunLockRegistry>,
        now: DateTime<Utc>,
    ) -> Result<BatchSummary, JobError> {
        let key = run_key(now);
        let _guard = locks
            .try_acquire(&key)
            .ok_or_else(|| JobError::AlreadyRunning(key.clone()))?;
        self.execute(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use nudge_core::Subscription;

    use crate::core::Cadence;
    use crate::registry::SendRegistry;
    use crate::store::StoreError;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn scheduler() -> Arc<NotificationScheduler> {
        Arc::new(NotificationScheduler::new(
            SendRegistry::new(),
            Cadence::hourly(),
        ))
    }

    struct FailingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl crate::store::SubscriptionStore for FailingStore {
        async fn enabled_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("store offline".to_string()))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl crate::store::SubscriptionStore for SlowStore {
        async fn enabled_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(Vec::new())
        }
    }

    // -- run_key -----------------------------------------------------------

    #[test]
    fn run_key_stable_within_hour() {
        let a = run_key(at("2026-01-05T08:00:00Z"));
        let b = run_key(at("2026-01-05T08:59:59Z"));
        assert_eq!(a, b);
        assert_eq!(a, "process-scheduled-notifications-2026-01-05-08");
    }

    #[test]
    fn run_key_differs_across_hours() {
        let a = run_key(at("2026-01-05T08:59:59Z"));
        let b = run_key(at("2026-01-05T09:00:00Z"));
        assert_ne!(a, b);
    }

    // -- RunLockRegistry ---------------------------------------------------

    #[test]
    fn lock_refuses_second_holder_until_release() {
        let locks = Arc::new(RunLockRegistry::new());

        let guard = locks.try_acquire("k").expect("first acquire");
        assert!(locks.try_acquire("k").is_none());
        assert!(locks.is_held("k"));

        drop(guard);
        assert!(!locks.is_held("k"));
        assert!(locks.try_acquire("k").is_some());
    }

    #[test]
    fn lock_keys_are_independent() {
        let locks = Arc::new(RunLockRegistry::new());
        let _a = locks.try_acquire("a").unwrap();
        assert!(locks.try_acquire("b").is_some());
    }

    // -- execute -----------------------------------------------------------

    #[tokio::test]
    async fn store_failure_retries_to_budget_then_fails() {
        let store = Arc::new(FailingStore {
            calls: AtomicUsize::new(0),
        });
        let job = ScheduledRunJob::new(scheduler(), store.clone())
            .with_policy(3, Duration::from_secs(5));

        let result = job.execute(at("2026-01-05T08:05:00Z")).await;
        assert!(matches!(result, Err(JobError::Scheduler(_))));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn attempt_timeout_counts_as_failure() {
        let job = ScheduledRunJob::new(scheduler(), Arc::new(SlowStore))
            .with_policy(2, Duration::from_millis(10));

        let result = job.execute(at("2026-01-05T08:05:00Z")).await;
        assert!(matches!(result, Err(JobError::Timeout(_))));
    }

    #[tokio::test]
    async fn execute_locked_refuses_duplicate_run() {
        let locks = Arc::new(RunLockRegistry::new());
        let now = at("2026-01-05T08:05:00Z");

        let _guard = locks.try_acquire(&run_key(now)).unwrap();

        let job = ScheduledRunJob::new(
            scheduler(),
            Arc::new(crate::store::MemoryStore::new(Vec::new())),
        );
        let result = job.execute_locked(&locks, now).await;
        assert!(matches!(result, Err(JobError::AlreadyRunning(_))));
    }

    #[tokio::test]
    async fn execute_locked_releases_key_after_run() {
        let locks = Arc::new(RunLockRegistry::new());
        let now = at("2026-01-05T08:05:00Z");

        let job = ScheduledRunJob::new(
            scheduler(),
            Arc::new(crate::store::MemoryStore::new(Vec::new())),
        );
        job.execute_locked(&locks, now).await.unwrap();
        assert!(!locks.is_held(&run_key(now)));
    }
}
