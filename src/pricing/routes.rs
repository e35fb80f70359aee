//! HTTP routes for the pricing engine.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::AppState;

use super::catalog::{PriceRefreshReport, SyncReport};
use super::composer::ReservationQuote;
use super::models::{DbId, SeasonRule};
use super::packages;
use super::requests::{
    CatalogItemsRequest, LinkProductsRequest, OverlapQuery, QuoteRequest, ResolveSeasonQuery,
    SaveSeasonRuleRequest,
};
use super::responses::{LinkProductsResponse, SeasonResolveResponse};
use super::services::{self, PackageDetails};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pricing/seasons", post(save_season_rule))
        .route("/pricing/seasons/resolve", get(resolve_season))
        .route("/pricing/seasons/overlaps", get(overlapping_rules))
        .route("/pricing/quote", post(quote))
        .route("/pricing/catalog/sync", post(sync_catalog))
        .route("/pricing/catalog/refresh-prices", post(refresh_prices))
        .route("/pricing/packages/:id", get(package_details))
        .route("/pricing/packages/:id/products", put(link_products))
}

async fn resolve_season(
    State(state): State<AppState>,
    Query(query): Query<ResolveSeasonQuery>,
) -> Result<Json<SeasonResolveResponse>> {
    let store = state.store.as_ref();
    let lookup = services::resolve_season(store, &state.cache, query.date, query.audience).await?;

    let price = match (query.base_price, query.audience) {
        (Some(base), Some(audience)) => Some(
            services::seasonal_price(store, &state.cache, base, query.date, audience).await?,
        ),
        (Some(_), None) => {
            return Err(AppError::BadRequest(
                "base_price requires an audience".to_string(),
            ))
        }
        _ => None,
    };

    Ok(Json(SeasonResolveResponse { lookup, price }))
}

async fn save_season_rule(
    State(state): State<AppState>,
    Json(request): Json<SaveSeasonRuleRequest>,
) -> Result<Json<SeasonRule>> {
    let saved =
        services::save_season_rule(state.store.as_ref(), &state.cache, request.id, &request.rule)
            .await?;
    Ok(Json(saved))
}

async fn overlapping_rules(
    State(state): State<AppState>,
    Query(query): Query<OverlapQuery>,
) -> Result<Json<Vec<SeasonRule>>> {
    let rules = services::overlapping_rules(
        state.store.as_ref(),
        &state.cache,
        query.start_date,
        query.end_date,
        query.exclude_id,
    )
    .await?;
    Ok(Json(rules))
}

async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<ReservationQuote>> {
    let quote = services::compose_quote(
        state.store.as_ref(),
        &state.cache,
        state.settings,
        &request,
    )
    .await?;
    Ok(Json(quote))
}

async fn sync_catalog(
    State(state): State<AppState>,
    Json(request): Json<CatalogItemsRequest>,
) -> Json<SyncReport> {
    Json(services::sync_catalog(state.store.as_ref(), &state.cache, &request.items).await)
}

async fn refresh_prices(
    State(state): State<AppState>,
    Json(request): Json<CatalogItemsRequest>,
) -> Json<PriceRefreshReport> {
    Json(services::refresh_catalog_prices(state.store.as_ref(), &state.cache, &request.items).await)
}

async fn package_details(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> Result<Json<PackageDetails>> {
    Ok(Json(services::package_details(state.store.as_ref(), id).await?))
}

async fn link_products(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<LinkProductsRequest>,
) -> Result<Json<LinkProductsResponse>> {
    let products =
        packages::link_products(state.store.as_ref(), id, &request.modular_product_ids).await?;
    Ok(Json(LinkProductsResponse {
        package_id: id,
        products,
    }))
}
