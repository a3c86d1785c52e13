use auth::Role;
use auth::TokenType;
use axum::extract::Request;
use axum::extract::State;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::domain::errors::AuthError;
use crate::domain::identity::models::UserId;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;

/// Extension type carrying the authenticated subject through the request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

/// Middleware validating bearer ACCESS tokens on protected routes.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_token_from_header(&req)?;

    let claims = state.issuer.verify(token).map_err(|e| {
        tracing::warn!("Bearer token rejected: {}", e);
        ApiError::from(AuthError::from(e)).into_response()
    })?;

    // A refresh token is not a request credential.
    if claims.class != TokenType::Access {
        return Err(ApiError::from(AuthError::InvalidToken).into_response());
    }

    req.extensions_mut().insert(AuthenticatedUser {
        user_id: UserId(claims.subject),
        roles: claims.roles,
    });

    Ok(next.run(req).await)
}

fn extract_token_from_header(req: &Request) -> Result<&str, Response> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::from(AuthError::InvalidToken).into_response())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::from(AuthError::InvalidToken).into_response())?;

    if !auth_str.starts_with("Bearer ") {
        return Err(ApiError::from(AuthError::InvalidToken).into_response());
    }

    Ok(auth_str.trim_start_matches("Bearer "))
}
