//! Modular catalog synchronization.
//!
//! Every active sellable catalog item gets exactly one modular product whose
//! `source_item_id` points back at it. Running `sync` again is a no-op. The
//! lookup-then-insert sequence is not atomic; the store's uniqueness
//! constraint on `source_item_id` catches a racing insert, which is then
//! retried as a lookup and counted as skipped.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::cache::CodeCache;
use crate::pricing::models::{CatalogItem, DbId, ModularCategory, NewModularProduct};
use crate::store::{PricingStore, StoreError};

/// Characters kept from the item name before the id suffix.
const CODE_NAME_LEN: usize = 20;

/// Fold common Latin diacritics to their ASCII base letter.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'Á' | 'À' | 'Ä' | 'Â' | 'Ã' | 'Å' => 'A',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}

/// Derive the stable code of a modular product.
///
/// Diacritics are folded, the name is uppercased, anything other than
/// `[A-Z0-9]` and whitespace is dropped, whitespace runs become a single `_`,
/// the name part is truncated, and `_<source id>` is appended.
pub fn generate_code(name: &str, source_id: DbId) -> String {
    let cleaned: String = name
        .chars()
        .map(fold_diacritic)
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    let mut stem = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    stem.truncate(CODE_NAME_LEN);
    let stem = stem.trim_end_matches('_');

    if stem.is_empty() {
        format!("ITEM_{}", source_id)
    } else {
        format!("{}_{}", stem, source_id)
    }
}

/// Map a catalog category name to a modular category by keyword.
pub fn map_category(category: Option<&str>) -> ModularCategory {
    let Some(name) = category else {
        return ModularCategory::Services;
    };
    let name: String = name.chars().map(fold_diacritic).collect::<String>().to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| name.contains(w));

    if has(&["alojamiento", "habitacion", "programa", "lodging", "room"]) {
        ModularCategory::Lodging
    } else if has(&["alimentacion", "comida", "bebida", "restaurante", "food", "drink"]) {
        ModularCategory::Food
    } else if has(&["spa", "masaje", "tratamiento", "termal", "massage"]) {
        ModularCategory::Spa
    } else if has(&["entretenimiento", "actividad", "recreacion", "entertainment", "activit"]) {
        ModularCategory::Entertainment
    } else {
        ModularCategory::Services
    }
}

/// Per-item failure in a sync or price refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncIssue {
    pub item_id: DbId,
    pub reason: String,
}

/// Outcome of `CatalogSynchronizer::sync`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub created: u32,
    pub skipped: u32,
    pub errors: Vec<SyncIssue>,
}

/// Outcome of `CatalogSynchronizer::refresh_prices`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceRefreshReport {
    pub updated: u32,
    pub skipped: u32,
    pub errors: Vec<SyncIssue>,
}

enum ItemOutcome {
    Created,
    Skipped,
}

/// Mirrors catalog items into modular products.
pub struct CatalogSynchronizer<'a> {
    store: &'a dyn PricingStore,
    codes: &'a CodeCache,
}

impl<'a> CatalogSynchronizer<'a> {
    pub fn new(store: &'a dyn PricingStore, codes: &'a CodeCache) -> Self {
        Self { store, codes }
    }

    pub async fn sync(&self, items: &[CatalogItem]) -> SyncReport {
        let mut report = SyncReport::default();

        for item in items {
            match self.sync_item(item).await {
                Ok(ItemOutcome::Created) => report.created += 1,
                Ok(ItemOutcome::Skipped) => report.skipped += 1,
                Err(reason) => {
                    tracing::warn!(source_item_id = item.id, %reason, "Catalog item not synchronized");
                    report.errors.push(SyncIssue {
                        item_id: item.id,
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            created = report.created,
            skipped = report.skipped,
            errors = report.errors.len(),
            "Catalog synchronization finished"
        );
        report
    }

    async fn sync_item(&self, item: &CatalogItem) -> Result<ItemOutcome, String> {
        if !item.is_active {
            return Ok(ItemOutcome::Skipped);
        }
        if item.base_price < Decimal::ZERO {
            return Err(format!("negative base price {}", item.base_price));
        }

        if self
            .store
            .find_modular_by_source(item.id)
            .await
            .map_err(|e| e.to_string())?
            .is_some()
        {
            return Ok(ItemOutcome::Skipped);
        }

        let product = NewModularProduct {
            code: self.codes.code_for(item).await,
            name: item.name.trim().to_string(),
            price: item.base_price,
            category: map_category(item.category.as_deref()),
            source_item_id: Some(item.id),
        };

        match self.store.insert_modular_product(&product).await {
            Ok(created) => {
                tracing::debug!(
                    source_item_id = item.id,
                    modular_product_id = created.id,
                    code = %created.code,
                    "Modular product created"
                );
                Ok(ItemOutcome::Created)
            }
            Err(StoreError::UniqueViolation { constraint }) => {
                // Lost a race with a concurrent sync: the row now exists.
                let existing = self
                    .store
                    .find_modular_by_source(item.id)
                    .await
                    .map_err(|e| e.to_string())?;
                match existing {
                    Some(_) => {
                        tracing::warn!(
                            source_item_id = item.id,
                            %constraint,
                            "Concurrent insert detected, treating as skipped"
                        );
                        Ok(ItemOutcome::Skipped)
                    }
                    None => Err(format!("code {} already in use ({})", product.code, constraint)),
                }
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Update mirrored prices that drifted from the catalog.
    pub async fn refresh_prices(&self, items: &[CatalogItem]) -> PriceRefreshReport {
        let mut report = PriceRefreshReport::default();

        for item in items {
            if item.base_price < Decimal::ZERO {
                report.errors.push(SyncIssue {
                    item_id: item.id,
                    reason: format!("negative base price {}", item.base_price),
                });
                continue;
            }

            let mirror = match self.store.find_modular_by_source(item.id).await {
                Ok(Some(mirror)) => mirror,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    report.errors.push(SyncIssue {
                        item_id: item.id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if mirror.price == item.base_price {
                continue;
            }

            match self.store.update_modular_price(mirror.id, item.base_price).await {
                Ok(()) => {
                    tracing::debug!(
                        modular_product_id = mirror.id,
                        old = %mirror.price,
                        new = %item.base_price,
                        "Modular product price refreshed"
                    );
                    report.updated += 1;
                }
                Err(e) => report.errors.push(SyncIssue {
                    item_id: item.id,
                    reason: e.to_string(),
                }),
            }
        }

        tracing::info!(
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "Modular price refresh finished"
        );
        report
    }
}
