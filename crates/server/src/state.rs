use std::sync::Arc;

use nudge_scheduler::{NotificationScheduler, RunLockRegistry, ScheduledRunJob, SubscriptionStore};

pub struct AppState {
    pub scheduler: Arc<NotificationScheduler>,
    pub store: Arc<dyn SubscriptionStore>,
    pub job: Arc<ScheduledRunJob>,
    pub locks: Arc<RunLockRegistry>,
    /// Shared secret for the manual trigger endpoint; `None` rejects all.
    pub trigger_token: Option<String>,
}
