//! [`NotificationScheduler`] — due-check orchestration and dispatch.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use nudge_core::Subscription;

use crate::cron::{is_due, parse_schedule, ScheduleError};
use crate::registry::SendRegistry;
use crate::store::{StoreError, SubscriptionStore};

/// Polling interval and due-check lookback window as one value.
///
/// The lookback exists to compensate for the poll cadence; deriving it from
/// the interval keeps the pair from drifting apart when the cadence changes.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    poll_interval: StdDuration,
    lookback: chrono::Duration,
}

impl Cadence {
    /// Cadence for a given polling interval; the lookback window equals the
    /// interval.
    pub fn from_poll_interval(poll_interval: StdDuration) -> Self {
        Self {
            poll_interval,
            lookback: chrono::Duration::from_std(poll_interval)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    /// The production cadence: poll hourly, look back one hour.
    pub fn hourly() -> Self {
        Self::from_poll_interval(StdDuration::from_secs(3600))
    }

    pub fn poll_interval(&self) -> StdDuration {
        self.poll_interval
    }

    pub fn lookback(&self) -> chrono::Duration {
        self.lookback
    }
}

/// Scheduler-level failure: the subscription source itself was unreachable.
/// Per-subscription failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("failed to load subscriptions: {0}")]
    Store(#[from] StoreError),
}

/// Per-subscription result of one processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DispatchOutcome {
    Sent,
    Failed { reason: String },
    UnknownKind,
    InvalidSchedule,
    NotDue,
}

/// Aggregated counts for one processing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchSummary {
    /// Subscriptions loaded and evaluated.
    pub evaluated: usize,
    /// Subscriptions whose schedule was due at the evaluation instant.
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    pub unknown_kind: usize,
    pub invalid_schedule: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent => {
                self.due += 1;
                self.sent += 1;
            }
            DispatchOutcome::Failed { .. } => {
                self.due += 1;
                self.failed += 1;
            }
            DispatchOutcome::UnknownKind => {
                self.due += 1;
                self.unknown_kind += 1;
            }
            DispatchOutcome::InvalidSchedule => self.invalid_schedule += 1,
            DispatchOutcome::NotDue => {}
        }
    }
}

/// Evaluates every active subscription against an instant and dispatches
/// the due ones through registered send routines.
///
/// Stateless across calls: subscriptions are re-read from the store on
/// every invocation, and no last-fired state is kept anywhere. Repeat
/// suppression is entirely the lookback window's job.
pub struct NotificationScheduler {
    registry: SendRegistry,
    cadence: Cadence,
}

impl NotificationScheduler {
    pub fn new(registry: SendRegistry, cadence: Cadence) -> Self {
        Self { registry, cadence }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Kind tags with a registered send routine, sorted.
    pub fn registered_kinds(&self) -> Vec<&str> {
        self.registry.kinds()
    }

    /// Evaluate all subscriptions at `now` and dispatch sends for the due
    /// ones. One subscription's failure never blocks the rest; only a store
    /// load failure aborts the pass.
    pub async fn process_pending(
        &self,
        store: &dyn SubscriptionStore,
        now: DateTime<Utc>,
    ) -> Result<BatchSummary, SchedulerError> {
        let subscriptions = store.enabled_subscriptions().await?;

        let mut summary = BatchSummary::default();
        for subscription in &subscriptions {
            if !subscription.is_active() {
                continue;
            }
            summary.evaluated += 1;

            let outcome = self.dispatch_one(subscription, now).await;
            summary.record(&outcome);
        }

        info!(
            evaluated = summary.evaluated,
            due = summary.due,
            sent = summary.sent,
            failed = summary.failed,
            "notification pass complete"
        );
        Ok(summary)
    }

    /// How many subscriptions `process_pending` would dispatch at `now`,
    /// without invoking any send routine. Dry-run for operator tooling.
    pub async fn pending_count(
        &self,
        store: &dyn SubscriptionStore,
        now: DateTime<Utc>,
    ) -> Result<usize, SchedulerError> {
        let subscriptions = store.enabled_subscriptions().await?;

        let count = subscriptions
            .iter()
            .filter(|s| s.is_active())
            .filter(|s| self.evaluate(s, now).unwrap_or(false))
            .count();
        Ok(count)
    }

    /// Due-check one subscription. Invalid schedules surface as errors so
    /// the caller can count and log them.
    fn evaluate(
        &self,
        subscription: &Subscription,
        now: DateTime<Utc>,
    ) -> Result<bool, ScheduleError> {
        let schedule = parse_schedule(&subscription.schedule)?;
        Ok(is_due(&schedule, now, self.cadence.lookback))
    }

    async fn dispatch_one(&self, subscription: &Subscription, now: DateTime<Utc>) -> DispatchOutcome {
        let due = match self.evaluate(subscription, now) {
            Ok(due) => due,
            Err(e) => {
                warn!(
                    user_id = %subscription.user.id,
                    kind = %subscription.kind,
                    error = %e,
                    "invalid schedule — skipping subscription"
                );
                return DispatchOutcome::InvalidSchedule;
            }
        };

        if !due {
            return DispatchOutcome::NotDue;
        }

        let routine = match self.registry.get(&subscription.kind) {
            Some(r) => r,
            None => {
                warn!(
                    user_id = %subscription.user.id,
                    kind = %subscription.kind,
                    "no send routine registered for kind — skipping"
                );
                return DispatchOutcome::UnknownKind;
            }
        };

        debug!(
            user_id = %subscription.user.id,
            kind = %subscription.kind,
            "subscription due — dispatching"
        );

        match routine.send(&subscription.user).await {
            Ok(()) => DispatchOutcome::Sent,
            Err(e) => {
                warn!(
                    user_id = %subscription.user.id,
                    kind = %subscription.kind,
                    error = %e,
                    "send routine failed — continuing with remaining subscriptions"
                );
                DispatchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
