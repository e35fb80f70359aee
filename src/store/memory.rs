//! In-memory `PricingStore`.
//!
//! Every write validates first and mutates second under one write lock, so a
//! failed write leaves no partial state behind. Uniqueness and reference
//! checks mirror the constraints of the PostgreSQL schema.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{PricingStore, ReservationVersion, StoreError, StoredReservation};
use crate::pricing::composer::{PriceSnapshot, Totals};
use crate::pricing::models::{
    DbId, ModularProduct, NewModularProduct, NewPackage, NewReservation, NewSeasonRule, Package,
    Reservation, ReservationStatus, SeasonRule,
};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: DbId,
    season_rules: BTreeMap<DbId, SeasonRule>,
    modular_products: BTreeMap<DbId, ModularProduct>,
    packages: BTreeMap<DbId, Package>,
    /// (package_id, modular_product_id) in link order
    package_links: Vec<(DbId, DbId)>,
    reservations: BTreeMap<DbId, Reservation>,
    snapshots: BTreeMap<DbId, PriceSnapshot>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    fn check_version(&self, id: DbId, expected: ReservationVersion) -> Result<&Reservation, StoreError> {
        let current = self.reservations.get(&id).ok_or(StoreError::NotFound {
            entity: "reservation",
            id,
        })?;
        if ReservationVersion::of(current) != expected {
            return Err(StoreError::Conflict {
                entity: "reservation",
                id,
            });
        }
        Ok(current)
    }

    fn check_snapshot_refs(
        &self,
        header: &NewReservation,
        snapshot: &PriceSnapshot,
    ) -> Result<(), StoreError> {
        if let Some(package_id) = header.package_id {
            if !self.packages.contains_key(&package_id) {
                return Err(StoreError::ForeignKeyViolation {
                    constraint: "reservations_package_id_fkey".to_string(),
                });
            }
        }
        for line in &snapshot.package_lines {
            if !self.modular_products.contains_key(&line.modular_product_id) {
                return Err(StoreError::ForeignKeyViolation {
                    constraint: "reservation_package_lines_modular_product_id_fkey".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn season_rule(id: DbId, rule: &NewSeasonRule) -> SeasonRule {
    SeasonRule {
        id,
        name: rule.name.clone(),
        season_type: rule.season_type,
        start_date: rule.start_date,
        end_date: rule.end_date,
        discount_percent: rule.discount_percent,
        priority: rule.priority,
        applies_to_rooms: rule.applies_to_rooms,
        applies_to_programs: rule.applies_to_programs,
        is_active: rule.is_active,
    }
}

/// `PricingStore` kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PricingStore for MemoryStore {
    async fn list_season_rules(&self) -> Result<Vec<SeasonRule>, StoreError> {
        Ok(self.state.read().await.season_rules.values().cloned().collect())
    }

    async fn save_season_rule(
        &self,
        id: Option<DbId>,
        rule: &NewSeasonRule,
    ) -> Result<SeasonRule, StoreError> {
        let mut state = self.state.write().await;
        let id = match id {
            Some(id) if state.season_rules.contains_key(&id) => id,
            Some(id) => {
                return Err(StoreError::NotFound {
                    entity: "season rule",
                    id,
                })
            }
            None => state.next_id(),
        };
        let saved = season_rule(id, rule);
        state.season_rules.insert(id, saved.clone());
        Ok(saved)
    }

    async fn find_modular_by_source(
        &self,
        source_item_id: DbId,
    ) -> Result<Option<ModularProduct>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .modular_products
            .values()
            .find(|p| p.source_item_id == Some(source_item_id))
            .cloned())
    }

    async fn insert_modular_product(
        &self,
        product: &NewModularProduct,
    ) -> Result<ModularProduct, StoreError> {
        let mut state = self.state.write().await;
        for existing in state.modular_products.values() {
            if product.source_item_id.is_some() && existing.source_item_id == product.source_item_id {
                return Err(StoreError::UniqueViolation {
                    constraint: "modular_products_source_item_id_key".to_string(),
                });
            }
            if existing.code == product.code {
                return Err(StoreError::UniqueViolation {
                    constraint: "modular_products_code_key".to_string(),
                });
            }
        }

        let id = state.next_id();
        let created = ModularProduct {
            id,
            code: product.code.clone(),
            name: product.name.clone(),
            price: product.price,
            category: product.category,
            source_item_id: product.source_item_id,
            is_active: true,
        };
        state.modular_products.insert(id, created.clone());
        Ok(created)
    }

    async fn update_modular_price(&self, id: DbId, price: Decimal) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let product = state
            .modular_products
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "modular product",
                id,
            })?;
        product.price = price;
        Ok(())
    }

    async fn set_modular_active(&self, id: DbId, is_active: bool) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let product = state
            .modular_products
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "modular product",
                id,
            })?;
        product.is_active = is_active;
        Ok(())
    }

    async fn find_modular_products(&self, ids: &[DbId]) -> Result<Vec<ModularProduct>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.modular_products.get(id).cloned())
            .collect())
    }

    async fn list_modular_products(&self) -> Result<Vec<ModularProduct>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .modular_products
            .values()
            .cloned()
            .collect())
    }

    async fn insert_package(&self, package: &NewPackage) -> Result<Package, StoreError> {
        let mut state = self.state.write().await;
        if state.packages.values().any(|p| p.code == package.code) {
            return Err(StoreError::UniqueViolation {
                constraint: "packages_code_key".to_string(),
            });
        }
        let id = state.next_id();
        let created = Package {
            id,
            name: package.name.clone(),
            code: package.code.clone(),
            description: package.description.clone(),
            is_active: true,
        };
        state.packages.insert(id, created.clone());
        Ok(created)
    }

    async fn find_package(&self, id: DbId) -> Result<Option<Package>, StoreError> {
        Ok(self.state.read().await.packages.get(&id).cloned())
    }

    async fn set_package_active(&self, id: DbId, is_active: bool) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let package = state.packages.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "package",
            id,
        })?;
        package.is_active = is_active;
        Ok(())
    }

    async fn linked_products(&self, package_id: DbId) -> Result<Vec<ModularProduct>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .package_links
            .iter()
            .filter(|(pkg, _)| *pkg == package_id)
            .filter_map(|(_, product_id)| state.modular_products.get(product_id).cloned())
            .collect())
    }

    async fn replace_package_links(
        &self,
        package_id: DbId,
        product_ids: &[DbId],
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.packages.contains_key(&package_id) {
            return Err(StoreError::NotFound {
                entity: "package",
                id: package_id,
            });
        }
        for (i, id) in product_ids.iter().enumerate() {
            if !state.modular_products.contains_key(id) {
                return Err(StoreError::ForeignKeyViolation {
                    constraint: "package_links_modular_product_id_fkey".to_string(),
                });
            }
            if product_ids[..i].contains(id) {
                return Err(StoreError::UniqueViolation {
                    constraint: "package_links_pkey".to_string(),
                });
            }
        }

        state.package_links.retain(|(pkg, _)| *pkg != package_id);
        state
            .package_links
            .extend(product_ids.iter().map(|id| (package_id, *id)));
        Ok(())
    }

    async fn insert_reservation(
        &self,
        header: &NewReservation,
        snapshot: &PriceSnapshot,
    ) -> Result<Reservation, StoreError> {
        let mut state = self.state.write().await;
        state.check_snapshot_refs(header, snapshot)?;

        let id = state.next_id();
        let now = Utc::now();
        let reservation = Reservation {
            id,
            quote_id: header.quote_id,
            client_ref: header.client_ref.clone(),
            start_date: header.start_date,
            end_date: header.end_date,
            status: header.status,
            package_id: header.package_id,
            adjustment: header.adjustment.clone(),
            grand_total: header.grand_total,
            discount_amount: header.discount_amount,
            surcharge_amount: header.surcharge_amount,
            final_price: header.final_price,
            created_at: now,
            updated_at: now,
        };
        state.reservations.insert(id, reservation.clone());
        state.snapshots.insert(id, snapshot.clone());
        Ok(reservation)
    }

    async fn replace_reservation(
        &self,
        id: DbId,
        expected: ReservationVersion,
        header: &NewReservation,
        snapshot: &PriceSnapshot,
    ) -> Result<Reservation, StoreError> {
        let mut state = self.state.write().await;
        let created_at = state.check_version(id, expected)?.created_at;
        state.check_snapshot_refs(header, snapshot)?;

        let reservation = Reservation {
            id,
            quote_id: header.quote_id,
            client_ref: header.client_ref.clone(),
            start_date: header.start_date,
            end_date: header.end_date,
            status: header.status,
            package_id: header.package_id,
            adjustment: header.adjustment.clone(),
            grand_total: header.grand_total,
            discount_amount: header.discount_amount,
            surcharge_amount: header.surcharge_amount,
            final_price: header.final_price,
            created_at,
            updated_at: Utc::now(),
        };
        state.reservations.insert(id, reservation.clone());
        state.snapshots.insert(id, snapshot.clone());
        Ok(reservation)
    }

    async fn update_reservation_status(
        &self,
        id: DbId,
        expected: ReservationVersion,
        status: ReservationStatus,
        totals: &Totals,
    ) -> Result<Reservation, StoreError> {
        let mut state = self.state.write().await;
        state.check_version(id, expected)?;
        let reservation = state.reservations.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "reservation",
            id,
        })?;
        reservation.status = status;
        reservation.grand_total = totals.grand_total;
        reservation.discount_amount = totals.discount_amount;
        reservation.surcharge_amount = totals.surcharge_amount;
        reservation.final_price = totals.final_price;
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }

    async fn get_reservation(&self, id: DbId) -> Result<Option<StoredReservation>, StoreError> {
        let state = self.state.read().await;
        Ok(state.reservations.get(&id).map(|reservation| StoredReservation {
            reservation: reservation.clone(),
            snapshot: state.snapshots.get(&id).cloned().unwrap_or_default(),
        }))
    }
}
