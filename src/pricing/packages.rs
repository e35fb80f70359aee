//! Package expansion and link administration.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::pricing::calculators::checked_sum;
use crate::pricing::error::PricingError;
use crate::pricing::models::{DbId, ModularProduct, Package};
use crate::store::PricingStore;

/// A linked product and whether it was deactivated after linking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedProduct {
    pub product: ModularProduct,
    pub stale: bool,
}

/// A package with its linked modular products, in link order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageExpansion {
    pub package: Package,
    pub products: Vec<LinkedProduct>,
}

impl PackageExpansion {
    /// Display price: the sum of the prices of active linked products.
    pub fn display_price(&self) -> Result<Decimal, PricingError> {
        checked_sum(
            self.products
                .iter()
                .filter(|p| !p.stale)
                .map(|p| p.product.price),
            "package price",
        )
    }
}

/// Load a package and its linked products.
///
/// Unknown and inactive packages fail. Links are trusted as validated at
/// link time; a product deactivated since then is kept and marked stale.
pub async fn expand(
    store: &dyn PricingStore,
    package_id: DbId,
) -> Result<PackageExpansion, PricingError> {
    let package = store
        .find_package(package_id)
        .await?
        .ok_or(PricingError::UnknownPackage(package_id))?;

    if !package.is_active {
        return Err(PricingError::InactivePackage(package_id));
    }

    let products = store
        .linked_products(package_id)
        .await?
        .into_iter()
        .map(|product| {
            let stale = !product.is_active;
            if stale {
                tracing::warn!(
                    package_id,
                    modular_product_id = product.id,
                    "Package links a deactivated modular product"
                );
            }
            LinkedProduct { product, stale }
        })
        .collect();

    Ok(PackageExpansion { package, products })
}

/// Replace a package's link set.
///
/// Every product must exist and be active. Duplicate ids are collapsed,
/// keeping the first occurrence.
pub async fn link_products(
    store: &dyn PricingStore,
    package_id: DbId,
    product_ids: &[DbId],
) -> Result<Vec<ModularProduct>, PricingError> {
    if store.find_package(package_id).await?.is_none() {
        return Err(PricingError::UnknownPackage(package_id));
    }

    let mut unique: Vec<DbId> = Vec::with_capacity(product_ids.len());
    for id in product_ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }

    let found = store.find_modular_products(&unique).await?;
    let invalid: Vec<DbId> = unique
        .iter()
        .copied()
        .filter(|id| !found.iter().any(|p| p.id == *id && p.is_active))
        .collect();
    if !invalid.is_empty() {
        return Err(PricingError::UnknownModularProducts(invalid));
    }

    store.replace_package_links(package_id, &unique).await?;
    tracing::info!(package_id, products = unique.len(), "Package links replaced");

    Ok(unique
        .iter()
        .filter_map(|id| found.iter().find(|p| p.id == *id).cloned())
        .collect())
}
