use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::errors::LifecycleError;
use crate::lifecycle::Outcome;
use crate::models::{Booking, BookingDetails, BookingStatus, NewBooking, PaymentStatus};
use crate::notifications::dispatch;
use crate::state::AppState;

use super::authenticate;

/// Runs `op` again on `Conflict`, up to `limit` extra attempts.
pub fn with_conflict_retry<T>(
    limit: u32,
    mut op: impl FnMut() -> Result<T, LifecycleError>,
) -> Result<T, LifecycleError> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if e.is_retryable() && attempt < limit => {
                attempt += 1;
                tracing::warn!(attempt, error = %e, "write conflict, retrying");
            }
            result => return result,
        }
    }
}

/// Persisted outcome goes back to the caller; its events go to the sink.
async fn finish(state: &AppState, result: Result<Outcome, LifecycleError>) -> Result<Json<Outcome>, Response> {
    let outcome = result.map_err(IntoResponse::into_response)?;
    dispatch(state.notifications.as_ref(), &outcome.events).await;
    Ok(Json(outcome))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewBooking>,
) -> Result<Response, Response> {
    let actor = authenticate(&headers, &state)?;
    let result = state.lifecycle.create_booking(&actor, &body);
    let outcome = finish(&state, result).await?;
    Ok((StatusCode::CREATED, outcome).into_response())
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, Response> {
    let actor = authenticate(&headers, &state)?;
    let booking = state
        .lifecycle
        .view_booking(&actor, &id)
        .map_err(IntoResponse::into_response)?;
    Ok(Json(booking))
}

// PATCH /api/bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<BookingDetails>,
) -> Result<Json<Outcome>, Response> {
    let actor = authenticate(&headers, &state)?;
    let result = with_conflict_retry(state.config.conflict_retry_limit, || {
        state.lifecycle.update_booking_details(&actor, &id, &body)
    });
    finish(&state, result).await
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Outcome>, Response> {
    let actor = authenticate(&headers, &state)?;
    let result = with_conflict_retry(state.config.conflict_retry_limit, || {
        state.lifecycle.cancel_booking(&actor, &id)
    });
    finish(&state, result).await
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
    pub worker_id: Option<String>,
}

// POST /api/bookings/:id/status
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Outcome>, Response> {
    let actor = authenticate(&headers, &state)?;
    let result = with_conflict_retry(state.config.conflict_retry_limit, || {
        state
            .lifecycle
            .change_status(&actor, &id, body.status, body.worker_id.as_deref())
    });
    finish(&state, result).await
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub payment_status: PaymentStatus,
    pub amount: Option<f64>,
}

// POST /api/bookings/:id/payment
pub async fn change_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<Outcome>, Response> {
    let actor = authenticate(&headers, &state)?;
    let result = with_conflict_retry(state.config.conflict_retry_limit, || {
        state
            .lifecycle
            .change_payment(&actor, &id, body.payment_status, body.amount)
    });
    finish(&state, result).await
}
