use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::RefreshTokenData;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    prev_password: String,
    new_password: String,
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<ApiSuccess<RefreshTokenData>, ApiError> {
    state
        .identity
        .update_password(user.user_id, &body.prev_password, &body.new_password)
        .await
        .map_err(ApiError::from)
        .map(|refresh_token| {
            ApiSuccess::new(StatusCode::OK, RefreshTokenData { refresh_token })
        })
}
