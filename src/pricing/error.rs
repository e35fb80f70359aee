//! Pricing error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::pricing::models::{DbId, ReservationStatus};
use crate::store::StoreError;

/// Errors that fail a pricing call.
///
/// Data anomalies that still resolve to a price (ambiguous rules, stale
/// package links, clamped discounts) are `QuoteWarning`s, not errors.
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Invalid date range: end {end} must be after start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Stay of {nights} nights exceeds the limit of {max_nights}")]
    StayTooLong { nights: u32, max_nights: u32 },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),

    #[error("Invalid season rule: {0}")]
    InvalidSeasonRule(String),

    #[error("Unknown package {0}")]
    UnknownPackage(DbId),

    #[error("Package {0} is inactive")]
    InactivePackage(DbId),

    #[error("Unknown or inactive modular products: {0:?}")]
    UnknownModularProducts(Vec<DbId>),

    #[error("Unknown reservation {0}")]
    UnknownReservation(DbId),

    #[error("Reservation cannot move from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Reservation {0} kept changing while being written")]
    ConcurrentModification(DbId),

    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    #[error("Quoted total {expected} no longer matches composed total {actual}")]
    QuoteMismatch { expected: Decimal, actual: Decimal },

    #[error("Reservation write rolled back: {0}")]
    CommitFailure(#[source] StoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
