use std::sync::Arc;
use std::time::Duration;

use auth::TokenIssuer;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::my_page::get_my_page;
use super::handlers::my_page::update_my_page;
use super::handlers::reissue::reissue;
use super::handlers::send_code::send_code;
use super::handlers::sign_in::sign_in;
use super::handlers::sign_up::sign_up;
use super::handlers::update_email::update_email;
use super::handlers::update_password::update_password;
use super::handlers::verify_email::verify_email;
use super::middleware::authenticate as auth_middleware;
use crate::domain::identity::service::IdentityService;
use crate::domain::verification::service::VerificationService;
use crate::outbound::store::postgres::PgStore;

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService<PgStore>>,
    pub verification: Arc<VerificationService<PgStore>>,
    pub issuer: Arc<TokenIssuer>,
}

pub fn create_router(
    identity: Arc<IdentityService<PgStore>>,
    verification: Arc<VerificationService<PgStore>>,
    issuer: Arc<TokenIssuer>,
) -> Router {
    let state = AppState {
        identity,
        verification,
        issuer,
    };

    let public_routes = Router::new()
        .route("/auth/email/code", post(send_code))
        .route("/auth/email/verify", post(verify_email))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/reissue", post(reissue));

    let protected_routes = Router::new()
        .route("/user/password", patch(update_password))
        .route("/user/email", patch(update_email))
        .route("/user/my-page", get(get_my_page).patch(update_my_page))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
