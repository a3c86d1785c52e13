use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::RefreshTokenData;
use crate::domain::identity::models::EmailAddress;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateEmailRequest {
    email: String,
}

pub async fn update_email(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateEmailRequest>,
) -> Result<ApiSuccess<RefreshTokenData>, ApiError> {
    let email = EmailAddress::new(body.email)?;

    state
        .identity
        .update_email(user.user_id, &email)
        .await
        .map_err(ApiError::from)
        .map(|refresh_token| {
            ApiSuccess::new(StatusCode::OK, RefreshTokenData { refresh_token })
        })
}
