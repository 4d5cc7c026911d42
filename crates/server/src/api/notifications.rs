//! Manual trigger and dry-run endpoints for the scheduled notification run.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use nudge_scheduler::run_key;

use super::auth::TriggerToken;
use crate::state::AppState;

// ── Manual trigger ────────────────────────────────────────────────

#[derive(Serialize)]
pub struct TriggerResponse {
    /// Whether the run was enqueued. Acknowledges enqueue, not completion.
    pub accepted: bool,
    pub run_key: String,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<&'static str>,
}

/// Enqueue a scheduled notification run for the current hour.
///
/// The hour's uniqueness key is claimed before spawning; a second trigger
/// (or an overlapping hourly tick) inside the same hour is refused.
pub async fn notifications_run(
    State(state): State<Arc<AppState>>,
    _token: TriggerToken,
) -> (StatusCode, Json<TriggerResponse>) {
    let now = Utc::now();
    let key = run_key(now);

    match state.locks.try_acquire(&key) {
        Some(guard) => {
            info!(run_key = %key, "manual trigger accepted — enqueueing run");
            let job = Arc::clone(&state.job);
            tokio::spawn(async move {
                let _guard = guard;
                if let Err(e) = job.execute(now).await {
                    warn!(error = %e, "manually triggered run failed");
                }
            });
            (
                StatusCode::ACCEPTED,
                Json(TriggerResponse {
                    accepted: true,
                    run_key: key,
                    requested_at: now,
                    detail: None,
                }),
            )
        }
        None => (
            StatusCode::CONFLICT,
            Json(TriggerResponse {
                accepted: false,
                run_key: key,
                requested_at: now,
                detail: Some("a run for this hour is already in flight"),
            }),
        ),
    }
}

// ── Dry run ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PendingParams {
    /// Evaluation instant (RFC 3339); defaults to now.
    pub at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct PendingResponse {
    pub pending: usize,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct PendingError {
    pub error: String,
}

/// How many notifications a run would dispatch, with zero side effects.
pub async fn notifications_pending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PendingParams>,
) -> Result<Json<PendingResponse>, (StatusCode, Json<PendingError>)> {
    let at = params.at.unwrap_or_else(Utc::now);

    match state.scheduler.pending_count(state.store.as_ref(), at).await {
        Ok(pending) => Ok(Json(PendingResponse {
            pending,
            evaluated_at: at,
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PendingError {
                error: e.to_string(),
            }),
        )),
    }
}
