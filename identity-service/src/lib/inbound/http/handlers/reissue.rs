use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::TokenPairData;
use crate::inbound::http::router::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReissueRequest {
    refresh_token: String,
}

pub async fn reissue(
    State(state): State<AppState>,
    Json(body): Json<ReissueRequest>,
) -> Result<ApiSuccess<TokenPairData>, ApiError> {
    state
        .identity
        .reissue(&body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|pair| ApiSuccess::new(StatusCode::OK, pair.into()))
}
