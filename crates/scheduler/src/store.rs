//! Subscription source boundary: the store trait and an in-memory impl.

use async_trait::async_trait;
use nudge_core::Subscription;

/// Failure to reach or read the subscription source. Propagates to the
/// scheduled-run job, which retries per its budget.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Read-only query surface over the external subscription collaborator.
///
/// The contract: return every subscription that is enabled and carries a
/// non-empty schedule expression. The core never writes back.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn enabled_subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;
}

/// Fixed in-memory store, for tests and embedding.
pub struct MemoryStore {
    subscriptions: Vec<Subscription>,
}

impl MemoryStore {
    pub fn new(subscriptions: Vec<Subscription>) -> Self {
        Self { subscriptions }
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn enabled_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|s| s.is_active())
            .cloned()
            .collect())
    }
}
