use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::identity::models::User;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MyPageData {
    pub email: String,
    pub profile: serde_json::Value,
}

impl From<User> for MyPageData {
    fn from(user: User) -> Self {
        Self {
            email: user.email.as_str().to_string(),
            profile: user.profile,
        }
    }
}

pub async fn get_my_page(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiSuccess<MyPageData>, ApiError> {
    state
        .identity
        .my_page(user.user_id)
        .await
        .map_err(ApiError::from)
        .map(|user| ApiSuccess::new(StatusCode::OK, user.into()))
}

pub async fn update_my_page(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(profile): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    state
        .identity
        .update_my_page(user.user_id, profile)
        .await?;

    Ok(StatusCode::OK)
}
