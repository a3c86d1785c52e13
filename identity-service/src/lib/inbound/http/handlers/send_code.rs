use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use crate::domain::identity::models::EmailAddress;
use crate::inbound::http::router::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendCodeRequest {
    email: String,
}

pub async fn send_code(
    State(state): State<AppState>,
    Json(body): Json<SendCodeRequest>,
) -> Result<StatusCode, ApiError> {
    let email = EmailAddress::new(body.email)?;

    state.verification.send_code(&email).await?;

    Ok(StatusCode::OK)
}
