use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::TokenPairData;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::SignUpCommand;
use crate::inbound::http::router::AppState;

/// HTTP request body for sign-up (raw JSON).
///
/// Everything besides the credentials rides along as the opaque profile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignUpRequest {
    email: String,
    password: String,
    #[serde(flatten)]
    profile: serde_json::Value,
}

impl SignUpRequest {
    fn try_into_command(self) -> Result<SignUpCommand, ApiError> {
        let email = EmailAddress::new(self.email)?;
        Ok(SignUpCommand::new(email, self.password, self.profile))
    }
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<ApiSuccess<TokenPairData>, ApiError> {
    let command = body.try_into_command()?;

    state
        .identity
        .sign_up(command)
        .await
        .map_err(ApiError::from)
        .map(|pair| ApiSuccess::new(StatusCode::OK, pair.into()))
}
