//! Send-routine trait and the kind → routine registry.
//!
//! Dispatch on notification kind is a registry lookup: new kinds are added
//! by registration, not by editing a central conditional.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nudge_core::UserRef;

/// Errors surfaced by a send routine. Delivery details (SMTP, templates)
/// belong to the routine's own crate; this boundary carries only enough to
/// log and count the failure.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("{0}")]
    Other(String),
}

/// A per-kind delivery capability. Implementations own their business rules
/// (e.g. "skip when there is nothing to report") and may block on network
/// I/O; they must be safe for concurrent invocation.
#[async_trait]
pub trait SendRoutine: Send + Sync {
    /// Deliver this notification kind to `user`.
    async fn send(&self, user: &UserRef) -> Result<(), SendError>;

    /// The notification-kind tag this routine handles.
    fn kind(&self) -> &str;
}

/// Maps notification-kind tags to their send routines.
#[derive(Default)]
pub struct SendRegistry {
    routines: HashMap<String, Arc<dyn SendRoutine>>,
}

impl SendRegistry {
    pub fn new() -> Self {
        Self {
            routines: HashMap::new(),
        }
    }

    /// Register a routine under its own kind tag. A later registration for
    /// the same kind replaces the earlier one.
    pub fn register(&mut self, routine: Arc<dyn SendRoutine>) {
        self.routines.insert(routine.kind().to_string(), routine);
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn SendRoutine>> {
        self.routines.get(kind)
    }

    /// Registered kind tags, sorted for stable display.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.routines.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}
