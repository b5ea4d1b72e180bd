//! Token refresh endpoint: one refresh token in, one new pair out. The
//! provider is asked exactly once; a rejection means the caller's session is
//! over.

use crate::littlejoys::{envelope, state::AppState};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshedSession {
    pub success: bool,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access/refresh pair", body = RefreshedSession),
        (status = 400, description = "Missing refresh token"),
        (status = 401, description = "Provider rejected the refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Response {
    let refresh_token = payload
        .and_then(|Json(request)| request.refresh_token)
        .filter(|token| !token.trim().is_empty());

    let Some(refresh_token) = refresh_token else {
        return envelope::failure(StatusCode::BAD_REQUEST, "Missing refresh token");
    };

    match state.auth.refresh_session(&refresh_token).await {
        Ok(session) => (
            StatusCode::OK,
            Json(RefreshedSession {
                success: true,
                access_token: session.access_token,
                refresh_token: session.refresh_token,
                expires_at: session.expires_at,
            }),
        )
            .into_response(),
        Err(err) => {
            debug!("refresh rejected: {err}");
            envelope::failure(StatusCode::UNAUTHORIZED, "Token refresh failed")
        }
    }
}
