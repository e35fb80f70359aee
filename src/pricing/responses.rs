//! Response DTOs for pricing API endpoints.
//!
//! Most domain types serialize as-is; the wrappers here only exist where an
//! endpoint combines several results.

use serde::Serialize;

use super::models::{DbId, ModularProduct};
use super::services::{PriceCalculation, SeasonLookup};

/// Response for season resolution
#[derive(Debug, Serialize)]
pub struct SeasonResolveResponse {
    #[serde(flatten)]
    pub lookup: SeasonLookup,
    /// Present when the request carried a base price and an audience
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<PriceCalculation>,
}

/// Response for a package link replacement
#[derive(Debug, Serialize)]
pub struct LinkProductsResponse {
    pub package_id: DbId,
    pub products: Vec<ModularProduct>,
}

/// Error response for pricing failures
#[derive(Debug, Serialize)]
pub struct PricingErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
