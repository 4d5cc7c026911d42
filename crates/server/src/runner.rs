//! Background loop driving the scheduled notification run.
//!
//! Sleeps for one poll interval, then executes the run under the hour's
//! uniqueness key. An overlapping manual trigger holds the same key, so a
//! busy hour is skipped rather than doubled.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use nudge_scheduler::JobError;

use crate::state::AppState;

pub async fn run_notification_loop(state: Arc<AppState>) {
    let interval = state.scheduler.cadence().poll_interval();
    info!(
        interval_secs = interval.as_secs(),
        "notification runner started"
    );

    loop {
        tokio::time::sleep(interval).await;

        let now = Utc::now();
        match state.job.execute_locked(&state.locks, now).await {
            Ok(summary) => {
                if summary.due > 0 {
                    info!(
                        sent = summary.sent,
                        failed = summary.failed,
                        "scheduled run dispatched notifications"
                    );
                } else {
                    debug!(evaluated = summary.evaluated, "scheduled run: nothing due");
                }
            }
            Err(JobError::AlreadyRunning(key)) => {
                info!(run_key = %key, "skipping tick — run already in flight");
            }
            Err(e) => {
                warn!(error = %e, "scheduled run failed — will retry next tick");
            }
        }
    }
}
