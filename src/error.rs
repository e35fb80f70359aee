//! Error handling for the application

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::pricing::error::PricingError;
use crate::pricing::responses::PricingErrorResponse;
use crate::store::StoreError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Pricing(PricingError::Store(err))
    }
}

fn store_status(err: &StoreError) -> (StatusCode, &'static str) {
    match err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        StoreError::UniqueViolation { .. } | StoreError::Conflict { .. } => {
            (StatusCode::CONFLICT, "conflict")
        }
        StoreError::ForeignKeyViolation { .. } => (StatusCode::CONFLICT, "reference_conflict"),
        StoreError::InvalidRow(_) | StoreError::Database(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<serde_json::Value>) {
        let AppError::Pricing(err) = self else {
            return match self {
                AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", None),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None),
            };
        };

        match err {
            PricingError::InvalidDateRange { start, end } => (
                StatusCode::BAD_REQUEST,
                "invalid_date_range",
                Some(json!({ "start_date": start, "end_date": end })),
            ),
            PricingError::StayTooLong { nights, max_nights } => (
                StatusCode::BAD_REQUEST,
                "stay_too_long",
                Some(json!({ "nights": nights, "max_nights": max_nights })),
            ),
            PricingError::InvalidSelection(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_selection", None)
            }
            PricingError::InvalidAdjustment(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_adjustment", None)
            }
            PricingError::InvalidSeasonRule(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_season_rule", None)
            }
            PricingError::UnknownModularProducts(ids) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unknown_modular_products",
                Some(json!({ "modular_product_ids": ids })),
            ),
            PricingError::UnknownPackage(id) => (
                StatusCode::NOT_FOUND,
                "unknown_package",
                Some(json!({ "package_id": id })),
            ),
            PricingError::UnknownReservation(id) => (
                StatusCode::NOT_FOUND,
                "unknown_reservation",
                Some(json!({ "reservation_id": id })),
            ),
            PricingError::InactivePackage(id) => (
                StatusCode::CONFLICT,
                "inactive_package",
                Some(json!({ "package_id": id })),
            ),
            PricingError::InvalidTransition { from, to } => (
                StatusCode::CONFLICT,
                "invalid_transition",
                Some(json!({ "from": from, "to": to })),
            ),
            PricingError::ConcurrentModification(id) => (
                StatusCode::CONFLICT,
                "concurrent_modification",
                Some(json!({ "reservation_id": id })),
            ),
            PricingError::AmountOverflow(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "amount_overflow", None)
            }
            PricingError::QuoteMismatch { expected, actual } => (
                StatusCode::CONFLICT,
                "quote_mismatch",
                Some(json!({ "expected": expected.to_string(), "actual": actual.to_string() })),
            ),
            PricingError::CommitFailure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "commit_failure", None)
            }
            PricingError::Store(store) => {
                let (status, error_type) = store_status(store);
                (status, error_type, None)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, details) = self.parts();

        let message = if status.is_server_error() {
            tracing::error!(error_type, "Request failed: {}", self);
            match &self {
                AppError::Pricing(PricingError::CommitFailure(_)) => {
                    "Reservation could not be saved".to_string()
                }
                _ => "Internal error".to_string(),
            }
        } else {
            tracing::debug!(error_type, "Request rejected: {}", self);
            self.to_string()
        };

        let body = PricingErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
