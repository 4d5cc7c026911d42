//! Notification scheduling for recurring per-user reminders.
//!
//! This crate provides:
//! - A pure cron due-check evaluator with a trailing lookback window
//!   compensating for coarse (hourly) polling
//! - `NotificationScheduler`, which evaluates every active subscription
//!   against an instant and dispatches the due ones through registered
//!   send routines, isolating failures per subscription
//! - `ScheduledRunJob`, the hourly unit of work with per-hour run
//!   uniqueness, a bounded retry budget, and a per-attempt timeout
//! - `SubscriptionStore` implementations (in-memory and YAML directory
//!   with hot-reload)

pub mod core;
pub mod cron;
pub mod job;
pub mod loader;
pub mod registry;
pub mod store;

#[cfg(test)]
mod tests;

pub use crate::core::{BatchSummary, Cadence, NotificationScheduler, SchedulerError};
pub use crate::cron::ScheduleError;
pub use crate::job::{run_key, JobError, RunLockRegistry, ScheduledRunJob};
pub use crate::loader::{LoadResult, LoadStatus, SubscriptionLoader};
pub use crate::registry::{SendError, SendRegistry, SendRoutine};
pub use crate::store::{MemoryStore, StoreError, SubscriptionStore};
