//! Request DTOs for pricing API endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::composer::Selection;
use super::models::{Audience, CatalogItem, DbId, NewSeasonRule, ReservationAdjustment};

/// Request to price a stay without persisting anything
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub selections: Vec<Selection>,
    #[serde(default)]
    pub package_id: Option<DbId>,
    #[serde(default)]
    pub adjustment: ReservationAdjustment,
}

/// Request to create or modify a reservation
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub client_ref: String,
    #[serde(flatten)]
    pub quote: QuoteRequest,
    /// Final price the client was shown; a different recomputed price aborts.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub expected_final_price: Option<Decimal>,
}

/// Query for `GET /pricing/seasons/resolve`
#[derive(Debug, Deserialize)]
pub struct ResolveSeasonQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub audience: Option<Audience>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub base_price: Option<Decimal>,
}

/// Create (`id` absent) or replace a season rule
#[derive(Debug, Deserialize)]
pub struct SaveSeasonRuleRequest {
    #[serde(default)]
    pub id: Option<DbId>,
    #[serde(flatten)]
    pub rule: NewSeasonRule,
}

/// Query for `GET /pricing/seasons/overlaps`
#[derive(Debug, Deserialize)]
pub struct OverlapQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub exclude_id: Option<DbId>,
}

/// Catalog snapshot pushed by the product catalog
#[derive(Debug, Deserialize)]
pub struct CatalogItemsRequest {
    pub items: Vec<CatalogItem>,
}

/// Replacement link set for a package
#[derive(Debug, Deserialize)]
pub struct LinkProductsRequest {
    pub modular_product_ids: Vec<DbId>,
}
