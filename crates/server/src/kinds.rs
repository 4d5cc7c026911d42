//! Concrete send routines for the built-in notification kinds.
//!
//! Bridges the scheduler's `SendRoutine` boundary to the notify crate:
//! each kind pulls its content from the [`TaskFeed`] collaborator, renders
//! an email, and delivers it. The "skip when there is nothing to report"
//! rule lives here, not in the scheduler.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use nudge_core::UserRef;
use nudge_notify::templating::{self, DigestContext, ReminderContext, TaskItem};
use nudge_notify::{Email, Notifier};
use nudge_scheduler::{SendError, SendRoutine};

pub const WEEKLY_DIGEST: &str = "weekly-digest";
pub const TASK_REMINDER: &str = "task-reminder";

/// Source of task content for the send routines. Stands in for the
/// task-CRUD side of the application, which manages tasks and picks the
/// weekly proposals.
#[async_trait]
pub trait TaskFeed: Send + Sync {
    /// Tasks proposed for the user's upcoming week.
    async fn weekly_tasks(&self, user: &UserRef) -> anyhow::Result<Vec<TaskItem>>;

    /// Tasks the user should be reminded about right now.
    async fn due_reminders(&self, user: &UserRef) -> anyhow::Result<Vec<TaskItem>>;
}

// ── Static feed ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct TaskEntry {
    title: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    last_done: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UserTasks {
    #[serde(default)]
    weekly: Vec<TaskEntry>,
    #[serde(default)]
    reminders: Vec<TaskEntry>,
}

/// Feed backed by a YAML file mapping user ids to task lists. Users absent
/// from the file simply have nothing to report.
pub struct StaticTaskFeed {
    users: HashMap<String, UserTasks>,
}

impl StaticTaskFeed {
    pub fn empty() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Load the feed from `path`. A missing or unparseable file yields an
    /// empty feed with a log line rather than failing startup.
    pub fn from_file(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => {
                debug!(path = %path.display(), "no tasks file — feed is empty");
                return Self::empty();
            }
        };
        match serde_yaml::from_str::<HashMap<String, UserTasks>>(&contents) {
            Ok(users) => Self { users },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse tasks file — feed is empty");
                Self::empty()
            }
        }
    }
}

fn to_item(entry: &TaskEntry) -> TaskItem {
    TaskItem {
        title: entry.title.clone(),
        category: entry.category.clone(),
        last_done: entry.last_done.clone(),
    }
}

#[async_trait]
impl TaskFeed for StaticTaskFeed {
    async fn weekly_tasks(&self, user: &UserRef) -> anyhow::Result<Vec<TaskItem>> {
        Ok(self
            .users
            .get(&user.id)
            .map(|t| t.weekly.iter().map(to_item).collect())
            .unwrap_or_default())
    }

    async fn due_reminders(&self, user: &UserRef) -> anyhow::Result<Vec<TaskItem>> {
        Ok(self
            .users
            .get(&user.id)
            .map(|t| t.reminders.iter().map(to_item).collect())
            .unwrap_or_default())
    }
}

// ── Send routines ─────────────────────────────────────────────────

/// Monday of the current week, ISO formatted, for the digest header.
fn current_week_monday() -> String {
    let today = Utc::now().date_naive();
    let monday = today - chrono::Duration::days(today.weekday().num_days_from_monday() as i64);
    monday.format("%Y-%m-%d").to_string()
}

/// Weekly digest: one email listing the week's proposed tasks.
pub struct WeeklyDigest {
    feed: Arc<dyn TaskFeed>,
    notifier: Arc<dyn Notifier>,
}

impl WeeklyDigest {
    pub fn new(feed: Arc<dyn TaskFeed>, notifier: Arc<dyn Notifier>) -> Self {
        Self { feed, notifier }
    }
}

#[async_trait]
impl SendRoutine for WeeklyDigest {
    async fn send(&self, user: &UserRef) -> Result<(), SendError> {
        let tasks = self
            .feed
            .weekly_tasks(user)
            .await
            .map_err(|e| SendError::Other(e.to_string()))?;

        if tasks.is_empty() {
            debug!(user_id = %user.id, "nothing to propose this week — skipping digest");
            return Ok(());
        }

        let ctx = DigestContext {
            user_name: user.name.clone(),
            week_of: current_week_monday(),
            tasks,
        };
        let rendered =
            templating::render_weekly_digest(&ctx).map_err(|e| SendError::Other(e.to_string()))?;

        self.notifier
            .send(&Email {
                to: user.email.clone(),
                subject: rendered.subject,
                body: rendered.body,
            })
            .await
            .map_err(|e| SendError::Delivery(e.to_string()))
    }

    fn kind(&self) -> &str {
        WEEKLY_DIGEST
    }
}

/// Task reminder: one email per task currently due for the user.
pub struct TaskReminder {
    feed: Arc<dyn TaskFeed>,
    notifier: Arc<dyn Notifier>,
}

impl TaskReminder {
    pub fn new(feed: Arc<dyn TaskFeed>, notifier: Arc<dyn Notifier>) -> Self {
        Self { feed, notifier }
    }
}

#[async_trait]
impl SendRoutine for TaskReminder {
    async fn send(&self, user: &UserRef) -> Result<(), SendError> {
        let tasks = self
            .feed
            .due_reminders(user)
            .await
            .map_err(|e| SendError::Other(e.to_string()))?;

        if tasks.is_empty() {
            debug!(user_id = %user.id, "no reminders due — skipping");
            return Ok(());
        }

        for task in tasks {
            let ctx = ReminderContext {
                user_name: user.name.clone(),
                task,
            };
            let rendered = templating::render_task_reminder(&ctx)
                .map_err(|e| SendError::Other(e.to_string()))?;

            self.notifier
                .send(&Email {
                    to: user.email.clone(),
                    subject: rendered.subject,
                    body: rendered.body,
                })
                .await
                .map_err(|e| SendError::Delivery(e.to_string()))?;
        }
        Ok(())
    }

    fn kind(&self) -> &str {
        TASK_REMINDER
    }
}
