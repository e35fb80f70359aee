//! Reservation route handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::pricing::models::{DbId, Reservation};
use crate::pricing::requests::ReservationRequest;
use crate::pricing::reservations::{self, CommittedReservation, Verification};
use crate::store::StoredReservation;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reservations", post(create))
        .route("/reservations/:id", get(show).put(modify))
        .route("/reservations/:id/confirm", post(confirm))
        .route("/reservations/:id/cancel", post(cancel))
        .route("/reservations/:id/complete", post(complete))
        .route("/reservations/:id/verify", get(verify))
}

async fn create(
    State(state): State<AppState>,
    Json(request): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<CommittedReservation>)> {
    let committed = reservations::create(
        state.store.as_ref(),
        &state.cache,
        state.settings,
        &request,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(committed)))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> Result<Json<StoredReservation>> {
    Ok(Json(reservations::get(state.store.as_ref(), id).await?))
}

async fn modify(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<ReservationRequest>,
) -> Result<Json<CommittedReservation>> {
    let committed = reservations::modify(
        state.store.as_ref(),
        &state.cache,
        state.settings,
        id,
        &request,
    )
    .await?;
    Ok(Json(committed))
}

async fn confirm(State(state): State<AppState>, Path(id): Path<DbId>) -> Result<Json<Reservation>> {
    Ok(Json(
        reservations::confirm(state.store.as_ref(), state.settings.currency_places, id).await?,
    ))
}

async fn cancel(State(state): State<AppState>, Path(id): Path<DbId>) -> Result<Json<Reservation>> {
    Ok(Json(reservations::cancel(state.store.as_ref(), id).await?))
}

async fn complete(State(state): State<AppState>, Path(id): Path<DbId>) -> Result<Json<Reservation>> {
    Ok(Json(reservations::complete(state.store.as_ref(), id).await?))
}

async fn verify(State(state): State<AppState>, Path(id): Path<DbId>) -> Result<Json<Verification>> {
    Ok(Json(
        reservations::verify(state.store.as_ref(), state.settings.currency_places, id).await?,
    ))
}
