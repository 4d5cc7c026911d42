//! Shared-secret auth for the manual trigger endpoint.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderName, StatusCode};
use axum::Json;
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::state::AppState;

const TRIGGER_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-trigger-token");

/// Rejection body for failed trigger auth.
#[derive(Serialize)]
pub struct AuthRejected {
    pub error: &'static str,
}

/// Extractor that admits a request only when `x-trigger-token` matches the
/// configured shared secret. Comparison is constant-time.
pub struct TriggerToken;

impl FromRequestParts<Arc<AppState>> for TriggerToken {
    type Rejection = (StatusCode, Json<AuthRejected>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.trigger_token.as_deref().ok_or((
            StatusCode::FORBIDDEN,
            Json(AuthRejected {
                error: "trigger token not configured",
            }),
        ))?;

        let provided = parts
            .headers
            .get(&TRIGGER_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(AuthRejected {
                    error: "missing trigger token",
                }),
            ))?;

        if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            return Err((
                StatusCode::FORBIDDEN,
                Json(AuthRejected {
                    error: "invalid trigger token",
                }),
            ));
        }

        Ok(TriggerToken)
    }
}
