//! Subscription schema shared across the scheduler, delivery, and server crates.

use serde::{Deserialize, Serialize};

/// Opaque reference to the user owning a subscription, plus the delivery
/// fields the send routines need. Minted and managed by the external
/// settings surface; never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// External user identifier.
    pub id: String,
    /// Delivery address for email notification kinds.
    pub email: String,
    /// Display name used in greetings.
    #[serde(default)]
    pub name: String,
}

/// One user's opt-in to one notification kind on a recurring schedule.
///
/// At most one subscription per (user, kind) pair should exist; the
/// subscription source is responsible for that invariant, not this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user: UserRef,
    /// Notification-kind tag selecting the send routine
    /// (e.g. "weekly-digest", "task-reminder").
    pub kind: String,
    /// 5-field cron expression: minute, hour, day-of-month, month, day-of-week.
    pub schedule: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Subscription {
    /// Whether this subscription should be considered by the scheduler at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.schedule.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(enabled: bool, schedule: &str) -> Subscription {
        Subscription {
            user: UserRef {
                id: "u1".to_string(),
                email: "u1@example.com".to_string(),
                name: "U One".to_string(),
            },
            kind: "weekly-digest".to_string(),
            schedule: schedule.to_string(),
            enabled,
        }
    }

    #[test]
    fn active_requires_enabled_and_schedule() {
        assert!(sub(true, "0 8 * * 1").is_active());
        assert!(!sub(false, "0 8 * * 1").is_active());
        assert!(!sub(true, "").is_active());
        assert!(!sub(true, "   ").is_active());
    }

    #[test]
    fn enabled_defaults_to_true() {
        let json = r#"{
            "user": { "id": "u2", "email": "u2@example.com" },
            "kind": "task-reminder",
            "schedule": "30 7 * * *"
        }"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert!(sub.enabled);
        assert_eq!(sub.user.name, "");
    }
}
