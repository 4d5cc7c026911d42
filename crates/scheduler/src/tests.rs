//! Scheduler orchestration tests: dispatch, isolation, and dry-run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use nudge_core::{Subscription, UserRef};

use crate::core::{Cadence, NotificationScheduler};
use crate::registry::{SendError, SendRegistry, SendRoutine};
use crate::store::MemoryStore;

struct MockRoutine {
    kind: String,
    send_count: Arc<AtomicUsize>,
    should_fail: bool,
}

impl MockRoutine {
    fn new(kind: &str, should_fail: bool) -> (Arc<Self>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let routine = Arc::new(Self {
            kind: kind.to_string(),
            send_count: count.clone(),
            should_fail,
        });
        (routine, count)
    }
}

#[async_trait]
impl SendRoutine for MockRoutine {
    async fn send(&self, _user: &UserRef) -> Result<(), SendError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            Err(SendError::Delivery("mock failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn kind(&self) -> &str {
        &self.kind
    }
}

fn sub(user_id: &str, kind: &str, schedule: &str, enabled: bool) -> Subscription {
    Subscription {
        user: UserRef {
            id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            name: String::new(),
        },
        kind: kind.to_string(),
        schedule: schedule.to_string(),
        enabled,
    }
}

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

/// Monday 08:05 — inside the window of "0 8 * * 1".
fn monday_0805() -> DateTime<Utc> {
    at("2026-01-05T08:05:00Z")
}

#[tokio::test]
async fn due_subscription_is_dispatched() {
    let (routine, count) = MockRoutine::new("weekly-digest", false);
    let mut registry = SendRegistry::new();
    registry.register(routine);

    let scheduler = NotificationScheduler::new(registry, Cadence::hourly());
    let store = MemoryStore::new(vec![sub("a", "weekly-digest", "0 8 * * 1", true)]);

    let summary = scheduler
        .process_pending(&store, monday_0805())
        .await
        .unwrap();

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_due_subscription_is_not_dispatched() {
    let (routine, count) = MockRoutine::new("weekly-digest", false);
    let mut registry = SendRegistry::new();
    registry.register(routine);

    let scheduler = NotificationScheduler::new(registry, Cadence::hourly());
    // Tuesday schedule, Monday evaluation.
    let store = MemoryStore::new(vec![sub("a", "weekly-digest", "0 8 * * 2", true)]);

    let summary = scheduler
        .process_pending(&store, monday_0805())
        .await
        .unwrap();

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.due, 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_schedule_is_nonfatal_and_counted() {
    let (routine, count) = MockRoutine::new("weekly-digest", false);
    let mut registry = SendRegistry::new();
    registry.register(routine);

    let scheduler = NotificationScheduler::new(registry, Cadence::hourly());
    let store = MemoryStore::new(vec![
        sub("a", "weekly-digest", "not-a-cron", true),
        sub("b", "weekly-digest", "0 8 * * 1", true),
    ]);

    let summary = scheduler
        .process_pending(&store, monday_0805())
        .await
        .unwrap();

    assert_eq!(summary.invalid_schedule, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disabled_subscription_produces_zero_sends() {
    let (routine, count) = MockRoutine::new("weekly-digest", false);
    let mut registry = SendRegistry::new();
    registry.register(routine);

    let scheduler = NotificationScheduler::new(registry, Cadence::hourly());
    let store = MemoryStore::new(vec![sub("a", "weekly-digest", "0 8 * * 1", false)]);

    let summary = scheduler
        .process_pending(&store, monday_0805())
        .await
        .unwrap();

    assert_eq!(summary.evaluated, 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn one_failing_send_does_not_block_others() {
    let (failing, fail_count) = MockRoutine::new("weekly-digest", true);
    let (ok, ok_count) = MockRoutine::new("task-reminder", false);
    let mut registry = SendRegistry::new();
    registry.register(failing);
    registry.register(ok);

    let scheduler = NotificationScheduler::new(registry, Cadence::hourly());
    let store = MemoryStore::new(vec![
        sub("a", "weekly-digest", "0 8 * * 1", true),
        sub("b", "task-reminder", "0 8 * * 1", true),
    ]);

    let summary = scheduler
        .process_pending(&store, monday_0805())
        .await
        .unwrap();

    assert_eq!(summary.due, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(fail_count.load(Ordering::SeqCst), 1);
    assert_eq!(ok_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_kind_is_skipped_not_fatal() {
    let (routine, count) = MockRoutine::new("weekly-digest", false);
    let mut registry = SendRegistry::new();
    registry.register(routine);

    let scheduler = NotificationScheduler::new(registry, Cadence::hourly());
    let store = MemoryStore::new(vec![
        sub("a", "monthly-report", "0 8 * * 1", true),
        sub("b", "weekly-digest", "0 8 * * 1", true),
    ]);

    let summary = scheduler
        .process_pending(&store, monday_0805())
        .await
        .unwrap();

    assert_eq!(summary.unknown_kind, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dry_run_counts_without_dispatching() {
    let (failing, fail_count) = MockRoutine::new("weekly-digest", true);
    let (ok, ok_count) = MockRoutine::new("task-reminder", false);
    let mut registry = SendRegistry::new();
    registry.register(failing);
    registry.register(ok);

    let scheduler = NotificationScheduler::new(registry, Cadence::hourly());
    let store = MemoryStore::new(vec![
        sub("a", "weekly-digest", "0 8 * * 1", true),
        sub("b", "task-reminder", "0 8 * * 1", true),
        sub("c", "weekly-digest", "0 8 * * 2", true),
        sub("d", "weekly-digest", "broken", true),
    ]);

    let pending = scheduler.pending_count(&store, monday_0805()).await.unwrap();

    assert_eq!(pending, 2);
    assert_eq!(fail_count.load(Ordering::SeqCst), 0);
    assert_eq!(ok_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dry_run_matches_process_due_count() {
    let (routine, _) = MockRoutine::new("weekly-digest", false);
    let mut registry = SendRegistry::new();
    registry.register(routine);

    let scheduler = NotificationScheduler::new(registry, Cadence::hourly());
    let subs = vec![
        sub("a", "weekly-digest", "0 8 * * 1", true),
        sub("b", "weekly-digest", "30 7 * * 1", true),
        sub("c", "weekly-digest", "0 20 * * 1", true),
    ];

    let now = monday_0805();
    let pending = scheduler
        .pending_count(&MemoryStore::new(subs.clone()), now)
        .await
        .unwrap();
    let summary = scheduler
        .process_pending(&MemoryStore::new(subs), now)
        .await
        .unwrap();

    assert_eq!(pending, summary.due);
    assert_eq!(pending, 2); // 08:00 exact-window and 07:30 lookback; 20:00 not due
}
