pub mod bookings;
pub mod health;
pub mod notifications;

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::{Actor, Role};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/bookings", post(bookings::create_booking))
        .route(
            "/api/bookings/:id",
            get(bookings::get_booking).patch(bookings::update_booking),
        )
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/bookings/:id/status", post(bookings::change_status))
        .route("/api/bookings/:id/payment", post(bookings::change_payment))
        .route("/api/notifications", get(notifications::events_stream))
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// The gateway in front of this service proves itself with a shared bearer token.
#[allow(clippy::result_large_err)]
fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), Response> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(error_response(StatusCode::UNAUTHORIZED, "unauthorized"));
    }
    Ok(())
}

/// The authenticated principal, as forwarded by the gateway.
#[allow(clippy::result_large_err)]
fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let id = header_value(headers, "x-actor-id")
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "missing X-Actor-Id"))?;
    let role = header_value(headers, "x-actor-role")
        .and_then(Role::parse)
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "missing or unknown X-Actor-Role"))?;

    Ok(Actor::new(id, role))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[allow(clippy::result_large_err)]
fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Actor, Response> {
    check_auth(headers, &state.config.api_token)?;
    actor_from_headers(headers)
}
