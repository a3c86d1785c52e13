use auth::TokenPair;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::errors::AuthError;

pub mod my_page;
pub mod reissue;
pub mod send_code;
pub mod sign_in;
pub mod sign_up;
pub mod update_email;
pub mod update_password;
pub mod verify_email;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<T>);

impl<T: Serialize> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Single translation boundary from domain errors to HTTP.
///
/// Clients only ever see the locale-neutral wire code; infrastructure
/// detail stays in the logs, keyed by a correlation id echoed to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError(AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AuthError::IllegalPassword | AuthError::IllegalCode | AuthError::InvalidEmail(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::SignInFailed
            | AuthError::WrongPassword
            | AuthError::InvalidToken
            | AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::NotVerified => StatusCode::FORBIDDEN,
            AuthError::UserNotFound | AuthError::EmailNotFound => StatusCode::NOT_FOUND,
            AuthError::Expired => StatusCode::GONE,
            AuthError::DuplicateEmail(_) => StatusCode::CONFLICT,
            AuthError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let AuthError::Infrastructure(detail) = &self.0 {
            let correlation_id = Uuid::new_v4().to_string();
            tracing::error!(
                correlation_id = %correlation_id,
                detail = %detail,
                "Infrastructure failure"
            );
            return (
                status,
                Json(json!({
                    "code": self.0.wire_code(),
                    "correlationId": correlation_id,
                })),
            )
                .into_response();
        }

        (status, Json(json!({ "code": self.0.wire_code() }))).into_response()
    }
}

/// Response body carrying a freshly issued token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairData {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenPairData {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

/// Response body carrying only a rotated refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenData {
    pub refresh_token: String,
}
