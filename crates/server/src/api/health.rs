//! Server readiness and operational overview.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Enabled subscriptions currently visible to the scheduler.
    pub subscriptions: usize,
    /// Notification kinds with a registered send routine.
    pub kinds: Vec<String>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let subscriptions = state
        .store
        .enabled_subscriptions()
        .await
        .map(|subs| subs.len())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        subscriptions,
        kinds: state
            .scheduler
            .registered_kinds()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}
