//! Reservation lifecycle.
//!
//! Creation and modification compose a fresh quote and persist its frozen
//! snapshot in one store write. Status transitions never recompose: confirm
//! recomputes totals from the snapshot lines already stored.
//!
//! Every write carries the header version it was computed from. When another
//! writer got there first the store answers `Conflict` and the operation
//! starts over from a fresh read.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::cache::AppCache;
use crate::store::{PricingStore, ReservationVersion, StoreError, StoredReservation};

use super::composer::{PriceSnapshot, PricingSettings, QuoteWarning, ReservationQuote, Totals};
use super::error::PricingError;
use super::models::{DbId, NewReservation, Reservation, ReservationStatus};
use super::requests::ReservationRequest;
use super::services::compose_quote;

/// A freshly written reservation plus the advisory findings of its quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedReservation {
    pub reservation: Reservation,
    pub snapshot: PriceSnapshot,
    pub warnings: Vec<QuoteWarning>,
}

/// Stored totals next to totals recomputed from the stored lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub reservation_id: DbId,
    pub stored: Totals,
    pub recomputed: Totals,
    pub consistent: bool,
}

fn stored_totals(reservation: &Reservation) -> Totals {
    Totals {
        grand_total: reservation.grand_total,
        discount_amount: reservation.discount_amount,
        surcharge_amount: reservation.surcharge_amount,
        final_price: reservation.final_price,
    }
}

fn header(client_ref: &str, quote: &ReservationQuote, status: ReservationStatus) -> NewReservation {
    NewReservation {
        quote_id: quote.quote_id,
        client_ref: client_ref.to_string(),
        start_date: quote.start_date,
        end_date: quote.end_date,
        status,
        package_id: quote.package_id,
        adjustment: quote.adjustment.clone(),
        grand_total: quote.totals.grand_total,
        discount_amount: quote.totals.discount_amount,
        surcharge_amount: quote.totals.surcharge_amount,
        final_price: quote.totals.final_price,
    }
}

fn check_expected(expected: Option<Decimal>, quote: &ReservationQuote) -> Result<(), PricingError> {
    match expected {
        Some(expected) if expected != quote.totals.final_price => {
            tracing::warn!(
                quote_id = %quote.quote_id,
                %expected,
                actual = %quote.totals.final_price,
                "Displayed price is stale"
            );
            Err(PricingError::QuoteMismatch {
                expected,
                actual: quote.totals.final_price,
            })
        }
        _ => Ok(()),
    }
}

fn validate_client_ref(client_ref: &str) -> Result<(), PricingError> {
    if client_ref.trim().is_empty() {
        return Err(PricingError::InvalidSelection(
            "client reference is required".to_string(),
        ));
    }
    Ok(())
}

/// Attempts of a guarded write before giving up on a busy reservation.
const WRITE_ATTEMPTS: u32 = 3;

fn write_error(id: DbId, err: StoreError) -> PricingError {
    match err {
        StoreError::NotFound { .. } => PricingError::UnknownReservation(id),
        err => PricingError::CommitFailure(err),
    }
}

async fn load(store: &dyn PricingStore, id: DbId) -> Result<StoredReservation, PricingError> {
    store
        .get_reservation(id)
        .await?
        .ok_or(PricingError::UnknownReservation(id))
}

/// Compose and persist a new reservation in `Draft`.
pub async fn create(
    store: &dyn PricingStore,
    cache: &AppCache,
    settings: PricingSettings,
    request: &ReservationRequest,
) -> Result<CommittedReservation, PricingError> {
    validate_client_ref(&request.client_ref)?;
    let quote = compose_quote(store, cache, settings, &request.quote).await?;
    check_expected(request.expected_final_price, &quote)?;

    let snapshot = quote.freeze();
    let reservation = store
        .insert_reservation(
            &header(&request.client_ref, &quote, ReservationStatus::Draft),
            &snapshot,
        )
        .await
        .map_err(PricingError::CommitFailure)?;

    tracing::info!(
        reservation_id = reservation.id,
        quote_id = %reservation.quote_id,
        final_price = %reservation.final_price,
        "Reservation created"
    );

    Ok(CommittedReservation {
        reservation,
        snapshot,
        warnings: quote.warnings,
    })
}

/// Recompose a reservation with current rules and replace its line set.
pub async fn modify(
    store: &dyn PricingStore,
    cache: &AppCache,
    settings: PricingSettings,
    id: DbId,
    request: &ReservationRequest,
) -> Result<CommittedReservation, PricingError> {
    validate_client_ref(&request.client_ref)?;

    for attempt in 1..=WRITE_ATTEMPTS {
        let current = load(store, id).await?.reservation;
        if !current.status.can_replace_lines() {
            return Err(PricingError::InvalidTransition {
                from: current.status,
                to: ReservationStatus::Modified,
            });
        }

        let quote = compose_quote(store, cache, settings, &request.quote).await?;
        check_expected(request.expected_final_price, &quote)?;

        let snapshot = quote.freeze();
        let status = current.status.after_replacement();
        let written = store
            .replace_reservation(
                id,
                ReservationVersion::of(&current),
                &header(&request.client_ref, &quote, status),
                &snapshot,
            )
            .await;

        match written {
            Ok(reservation) => {
                tracing::info!(
                    reservation_id = id,
                    from = %current.status,
                    to = %status,
                    final_price = %reservation.final_price,
                    "Reservation lines replaced"
                );
                return Ok(CommittedReservation {
                    reservation,
                    snapshot,
                    warnings: quote.warnings,
                });
            }
            Err(err) if err.is_conflict() => {
                tracing::debug!(reservation_id = id, attempt, "Reservation changed during modify");
            }
            Err(err) => return Err(write_error(id, err)),
        }
    }

    Err(PricingError::ConcurrentModification(id))
}

async fn transition(
    store: &dyn PricingStore,
    id: DbId,
    next: ReservationStatus,
    totals: impl Fn(&StoredReservation) -> Result<Totals, PricingError>,
) -> Result<Reservation, PricingError> {
    for attempt in 1..=WRITE_ATTEMPTS {
        let stored = load(store, id).await?;
        let from = stored.reservation.status;
        if !from.can_transition_to(next) {
            return Err(PricingError::InvalidTransition { from, to: next });
        }

        let totals = totals(&stored)?;
        let expected = ReservationVersion::of(&stored.reservation);
        match store.update_reservation_status(id, expected, next, &totals).await {
            Ok(reservation) => {
                tracing::info!(reservation_id = id, %from, to = %next, "Reservation status changed");
                return Ok(reservation);
            }
            Err(err) if err.is_conflict() => {
                tracing::debug!(reservation_id = id, attempt, to = %next, "Reservation changed during transition");
            }
            Err(err) => return Err(write_error(id, err)),
        }
    }

    Err(PricingError::ConcurrentModification(id))
}

/// `Draft | Modified -> Confirmed`, with totals recomputed from stored lines.
pub async fn confirm(
    store: &dyn PricingStore,
    currency_places: u32,
    id: DbId,
) -> Result<Reservation, PricingError> {
    transition(store, id, ReservationStatus::Confirmed, |stored| {
        stored
            .snapshot
            .totals(&stored.reservation.adjustment, currency_places)
    })
    .await
}

pub async fn cancel(store: &dyn PricingStore, id: DbId) -> Result<Reservation, PricingError> {
    transition(store, id, ReservationStatus::Cancelled, |stored| {
        Ok(stored_totals(&stored.reservation))
    })
    .await
}

pub async fn complete(store: &dyn PricingStore, id: DbId) -> Result<Reservation, PricingError> {
    transition(store, id, ReservationStatus::Completed, |stored| {
        Ok(stored_totals(&stored.reservation))
    })
    .await
}

pub async fn get(store: &dyn PricingStore, id: DbId) -> Result<StoredReservation, PricingError> {
    load(store, id).await
}

/// Recompute totals from the stored lines and compare with the header.
pub async fn verify(
    store: &dyn PricingStore,
    currency_places: u32,
    id: DbId,
) -> Result<Verification, PricingError> {
    let stored = load(store, id).await?;
    let recomputed = stored
        .snapshot
        .totals(&stored.reservation.adjustment, currency_places)?;
    let expected = stored_totals(&stored.reservation);
    let consistent = recomputed == expected;

    if !consistent {
        tracing::error!(
            reservation_id = id,
            stored = %expected.final_price,
            recomputed = %recomputed.final_price,
            "Stored totals disagree with stored lines"
        );
    }

    Ok(Verification {
        reservation_id: id,
        stored: expected,
        recomputed,
        consistent,
    })
}
