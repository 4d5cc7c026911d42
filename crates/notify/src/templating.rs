//! Minijinja template rendering for the digest and reminder emails.
//!
//! Templates are plain strings (overridable by deployments), so a fresh
//! [`minijinja::Environment`] is created per render call.

use serde::Serialize;

use crate::traits::NotifyError;

/// A task surfaced in a digest or reminder.
#[derive(Debug, Clone, Serialize)]
pub struct TaskItem {
    pub title: String,
    /// Category label (e.g. "Health", "Home").
    pub category: Option<String>,
    /// Human-readable hint for when it was last completed.
    pub last_done: Option<String>,
}

/// Context for the weekly digest email.
#[derive(Debug, Clone, Serialize)]
pub struct DigestContext {
    pub user_name: String,
    /// The Monday of the proposed week, ISO formatted.
    pub week_of: String,
    pub tasks: Vec<TaskItem>,
}

/// Context for a single task-reminder email.
#[derive(Debug, Clone, Serialize)]
pub struct ReminderContext {
    pub user_name: String,
    pub task: TaskItem,
}

/// A rendered subject/body pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub body: String,
}

const DIGEST_SUBJECT: &str = "Your tasks for the week of {{ week_of }}";

const DIGEST_BODY: &str = "\
Hi {{ user_name if user_name else 'there' }},

Here {{ 'is' if tasks | length == 1 else 'are' }} {{ tasks | length }} \
task{{ '' if tasks | length == 1 else 's' }} picked for this week:

{% for task in tasks -%}
  - {{ task.title }}{% if task.category %} ({{ task.category }}){% endif %}\
{% if task.last_done %} — last done {{ task.last_done }}{% endif %}
{% endfor %}
Tick them off as you go. See you next week!
";

const REMINDER_SUBJECT: &str = "Reminder: {{ task.title }}";

const REMINDER_BODY: &str = "\
Hi {{ user_name if user_name else 'there' }},

This is your reminder for: {{ task.title }}\
{% if task.last_done %} (last done {{ task.last_done }}){% endif %}.
";

/// Render the weekly digest email.
pub fn render_weekly_digest(ctx: &DigestContext) -> Result<Rendered, NotifyError> {
    Ok(Rendered {
        subject: render(DIGEST_SUBJECT, ctx)?,
        body: render(DIGEST_BODY, ctx)?,
    })
}

/// Render a single task-reminder email.
pub fn render_task_reminder(ctx: &ReminderContext) -> Result<Rendered, NotifyError> {
    Ok(Rendered {
        subject: render(REMINDER_SUBJECT, ctx)?,
        body: render(REMINDER_BODY, ctx)?,
    })
}

/// Render an arbitrary template string against a serializable context.
pub fn render<C: Serialize>(template: &str, ctx: &C) -> Result<String, NotifyError> {
    let mut env = minijinja::Environment::new();
    env.add_template("t", template)
        .map_err(|e| NotifyError::Template(e.to_string()))?;
    env.get_template("t")
        .and_then(|t| t.render(ctx))
        .map_err(|e| NotifyError::Template(e.to_string()))
}
