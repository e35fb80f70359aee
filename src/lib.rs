//! Seasonal pricing resolver and modular reservation composer.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod pricing;
pub mod routes;
pub mod store;

use std::sync::Arc;

use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::AppCache;
use crate::pricing::composer::PricingSettings;
use crate::store::PricingStore;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PricingStore>,
    pub cache: AppCache,
    pub settings: PricingSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn PricingStore>, cache: AppCache, settings: PricingSettings) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }
}

/// Build the full application router.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(pricing::router())
        .merge(routes::reservations::router())
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
