//! Pricing service functions.
//!
//! These wire the pure pricing pieces (season resolution, composition,
//! catalog mirroring) to a `PricingStore` and the application cache. Route
//! handlers and the reservation lifecycle call into this module.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cache::AppCache;
use crate::store::PricingStore;

use super::calculators::daily_price;
use super::catalog::{CatalogSynchronizer, PriceRefreshReport, SyncReport};
use super::composer::{PricingSettings, ReservationComposer, ReservationQuote, StayRange};
use super::error::PricingError;
use super::models::{Audience, CatalogItem, DbId, NewSeasonRule, SeasonRule, SeasonType};
use super::packages::{self, PackageExpansion};
use super::requests::QuoteRequest;
use super::seasons::validate_season_rule;

/// Winning season rule for one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonLookup {
    pub date: NaiveDate,
    pub audience: Option<Audience>,
    pub rule: Option<SeasonRule>,
    pub tied_rule_ids: Vec<DbId>,
}

/// Seasonal price of one night
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceCalculation {
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub seasonal_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_percent: Decimal,
    pub season_name: Option<String>,
    pub season_type: Option<SeasonType>,
}

/// A package with its display price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDetails {
    #[serde(flatten)]
    pub expansion: PackageExpansion,
    #[serde(with = "rust_decimal::serde::str")]
    pub display_price: Decimal,
}

/// Compose a quote against the current season rules.
///
/// Nothing is persisted. The package, when requested, is expanded from the
/// store at call time.
pub async fn compose_quote(
    store: &dyn PricingStore,
    cache: &AppCache,
    settings: PricingSettings,
    request: &QuoteRequest,
) -> Result<ReservationQuote, PricingError> {
    let stay = StayRange::new(request.start_date, request.end_date)?;
    let rules = cache.season_rules(store).await?;

    let package = match request.package_id {
        Some(id) => Some(packages::expand(store, id).await?),
        None => None,
    };

    ReservationComposer::new(&rules, settings).compose(
        &stay,
        &request.selections,
        package.as_ref(),
        &request.adjustment,
    )
}

/// Resolve the season for a date.
///
/// With an audience the per-audience rule applies; without one the winner
/// is picked across both audiences by the same precedence.
pub async fn resolve_season(
    store: &dyn PricingStore,
    cache: &AppCache,
    date: NaiveDate,
    audience: Option<Audience>,
) -> Result<SeasonLookup, PricingError> {
    let rules = cache.season_rules(store).await?;
    let resolution = match audience {
        Some(audience) => rules.resolve(date, audience),
        None => rules.resolve_any(date),
    };

    Ok(SeasonLookup {
        date,
        audience,
        rule: resolution.rule.cloned(),
        tied_rule_ids: resolution.tied_with,
    })
}

pub async fn seasonal_price(
    store: &dyn PricingStore,
    cache: &AppCache,
    base_price: Decimal,
    date: NaiveDate,
    audience: Audience,
) -> Result<PriceCalculation, PricingError> {
    let rules = cache.season_rules(store).await?;
    let rule = rules.resolve(date, audience).rule;
    let price = daily_price(base_price, rule)?;

    Ok(PriceCalculation {
        base_price,
        seasonal_price: price.final_price,
        discount_percent: rule.map(|r| r.discount_percent).unwrap_or(Decimal::ZERO),
        season_name: rule.map(|r| r.name.clone()),
        season_type: rule.map(|r| r.season_type),
    })
}

/// Validate and upsert a season rule, then drop the cached snapshot.
pub async fn save_season_rule(
    store: &dyn PricingStore,
    cache: &AppCache,
    id: Option<DbId>,
    rule: &NewSeasonRule,
) -> Result<SeasonRule, PricingError> {
    validate_season_rule(rule)?;
    let saved = store.save_season_rule(id, rule).await?;
    cache.invalidate_season_rules().await;

    tracing::info!(
        rule_id = saved.id,
        name = %saved.name,
        start = %saved.start_date,
        end = %saved.end_date,
        "Season rule saved"
    );
    Ok(saved)
}

/// Active rules intersecting `[start, end]`, for conflict previews.
pub async fn overlapping_rules(
    store: &dyn PricingStore,
    cache: &AppCache,
    start: NaiveDate,
    end: NaiveDate,
    exclude_id: Option<DbId>,
) -> Result<Vec<SeasonRule>, PricingError> {
    if end < start {
        return Err(PricingError::InvalidDateRange { start, end });
    }
    let rules = cache.season_rules(store).await?;
    Ok(rules
        .overlapping(start, end, exclude_id)
        .into_iter()
        .cloned()
        .collect())
}

pub async fn sync_catalog(
    store: &dyn PricingStore,
    cache: &AppCache,
    items: &[CatalogItem],
) -> SyncReport {
    CatalogSynchronizer::new(store, &cache.product_codes)
        .sync(items)
        .await
}

pub async fn refresh_catalog_prices(
    store: &dyn PricingStore,
    cache: &AppCache,
    items: &[CatalogItem],
) -> PriceRefreshReport {
    CatalogSynchronizer::new(store, &cache.product_codes)
        .refresh_prices(items)
        .await
}

pub async fn package_details(
    store: &dyn PricingStore,
    package_id: DbId,
) -> Result<PackageDetails, PricingError> {
    let expansion = packages::expand(store, package_id).await?;
    Ok(PackageDetails {
        display_price: expansion.display_price()?,
        expansion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::composer::Selection;
    use crate::pricing::models::{ModularCategory, NewModularProduct, NewPackage};
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(
        name: &str,
        season_type: SeasonType,
        start: NaiveDate,
        end: NaiveDate,
        percent: Decimal,
        priority: i32,
    ) -> NewSeasonRule {
        NewSeasonRule {
            name: name.to_string(),
            season_type,
            start_date: start,
            end_date: end,
            discount_percent: percent,
            priority,
            applies_to_rooms: true,
            applies_to_programs: false,
            is_active: true,
        }
    }

    fn room(base: Decimal) -> Selection {
        Selection {
            audience: Audience::Room,
            reference: "201".to_string(),
            base_price_per_night: base,
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn saving_a_rule_is_visible_to_the_next_quote() {
        let store = MemoryStore::new();
        let cache = AppCache::default();
        let request = QuoteRequest {
            start_date: date(2025, 2, 1),
            end_date: date(2025, 2, 3),
            selections: vec![room(dec!(100))],
            package_id: None,
            adjustment: Default::default(),
        };

        let before = compose_quote(&store, &cache, PricingSettings::default(), &request).await.unwrap();
        assert_eq!(before.totals.grand_total, dec!(200));

        save_season_rule(
            &store,
            &cache,
            None,
            &rule("Baja", SeasonType::Low, date(2025, 1, 1), date(2025, 3, 31), dec!(10), 1),
        )
        .await
        .unwrap();

        let after = compose_quote(&store, &cache, PricingSettings::default(), &request).await.unwrap();
        assert_eq!(after.totals.grand_total, dec!(180));
    }

    #[tokio::test]
    async fn invalid_rule_is_rejected_before_the_store() {
        let store = MemoryStore::new();
        let cache = AppCache::default();
        let bad = rule("Al revés", SeasonType::Mid, date(2025, 5, 1), date(2025, 4, 1), dec!(5), 1);

        assert_matches!(
            save_season_rule(&store, &cache, None, &bad).await,
            Err(PricingError::InvalidSeasonRule(_))
        );
        assert!(store.list_season_rules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seasonal_price_reports_the_winning_rule() {
        let store = MemoryStore::new();
        let cache = AppCache::default();
        for r in [
            rule("Baja", SeasonType::Low, date(2025, 1, 1), date(2025, 3, 31), dec!(10), 1),
            rule("Puente", SeasonType::High, date(2025, 2, 10), date(2025, 2, 20), dec!(-20), 5),
        ] {
            save_season_rule(&store, &cache, None, &r).await.unwrap();
        }

        let calc = seasonal_price(&store, &cache, dec!(100), date(2025, 2, 15), Audience::Room)
            .await
            .unwrap();
        assert_eq!(calc.seasonal_price, dec!(120));
        assert_eq!(calc.discount_percent, dec!(-20));
        assert_eq!(calc.season_type, Some(SeasonType::High));

        let program = seasonal_price(&store, &cache, dec!(100), date(2025, 2, 15), Audience::Program)
            .await
            .unwrap();
        assert_eq!(program.seasonal_price, dec!(100));
        assert!(program.season_name.is_none());

        let lookup = resolve_season(&store, &cache, date(2025, 2, 9), None).await.unwrap();
        assert_eq!(lookup.rule.map(|r| r.name), Some("Baja".to_string()));
    }

    #[tokio::test]
    async fn overlaps_exclude_the_rule_being_edited() {
        let store = MemoryStore::new();
        let cache = AppCache::default();
        let low = save_season_rule(
            &store,
            &cache,
            None,
            &rule("Baja", SeasonType::Low, date(2025, 1, 1), date(2025, 3, 31), dec!(10), 1),
        )
        .await
        .unwrap();

        let found = overlapping_rules(&store, &cache, date(2025, 3, 1), date(2025, 4, 30), None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let excluded = overlapping_rules(&store, &cache, date(2025, 3, 1), date(2025, 4, 30), Some(low.id))
            .await
            .unwrap();
        assert!(excluded.is_empty());
    }

    #[tokio::test]
    async fn package_details_sum_active_products() {
        let store = MemoryStore::new();
        let package = store
            .insert_package(&NewPackage {
                name: "Bienestar".to_string(),
                code: "PKG-WELL".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let mut ids = Vec::new();
        for (source, price) in [(1, dec!(45)), (2, dec!(15.50))] {
            let product = store
                .insert_modular_product(&NewModularProduct {
                    code: format!("ITEM_{}", source),
                    name: format!("Item {}", source),
                    price,
                    category: ModularCategory::Spa,
                    source_item_id: Some(source),
                })
                .await
                .unwrap();
            ids.push(product.id);
        }
        packages::link_products(&store, package.id, &ids).await.unwrap();

        let details = package_details(&store, package.id).await.unwrap();
        assert_eq!(details.display_price, dec!(60.50));
        assert_eq!(details.expansion.products.len(), 2);
    }
}
