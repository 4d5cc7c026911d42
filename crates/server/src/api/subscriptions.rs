//! Read-only subscription listing for operators.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct SubscriptionView {
    pub user_id: String,
    pub email: String,
    pub kind: String,
    pub schedule: String,
}

#[derive(Serialize)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionView>,
}

#[derive(Serialize)]
pub struct SubscriptionsError {
    pub error: String,
}

pub async fn subscriptions_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SubscriptionsResponse>, (StatusCode, Json<SubscriptionsError>)> {
    match state.store.enabled_subscriptions().await {
        Ok(subs) => Ok(Json(SubscriptionsResponse {
            subscriptions: subs
                .into_iter()
                .map(|s| SubscriptionView {
                    user_id: s.user.id,
                    email: s.user.email,
                    kind: s.kind,
                    schedule: s.schedule,
                })
                .collect(),
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SubscriptionsError {
                error: e.to_string(),
            }),
        )),
    }
}
