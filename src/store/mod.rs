//! Persistence seam for the pricing engine.
//!
//! The engine only talks to a `PricingStore`. Two implementations exist:
//! `MemoryStore` (tests and database-less runs) and `PgStore` (PostgreSQL).
//! Both enforce uniqueness of `modular_products.source_item_id` and write a
//! reservation header together with its lines or not at all.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::pricing::composer::{PriceSnapshot, Totals};
use crate::pricing::models::{
    DbId, ModularProduct, NewModularProduct, NewPackage, NewReservation, NewSeasonRule, Package,
    Reservation, ReservationStatus, SeasonRule,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store failure kinds the engine reacts to.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Foreign key violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("{entity} {id} changed since it was read")]
    Conflict { entity: &'static str, id: DbId },

    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or("unknown").to_string();
            if db.is_unique_violation() {
                return StoreError::UniqueViolation { constraint };
            }
            if db.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation { constraint };
            }
        }
        StoreError::Database(err)
    }
}

/// The header state a guarded reservation write expects to find.
///
/// Every composed quote has a fresh `quote_id`, so a matching version means
/// the stored line set is the one the caller read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationVersion {
    pub status: ReservationStatus,
    pub quote_id: Uuid,
}

impl ReservationVersion {
    pub fn of(reservation: &Reservation) -> Self {
        Self {
            status: reservation.status,
            quote_id: reservation.quote_id,
        }
    }
}

/// A reservation header together with its frozen line prices.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StoredReservation {
    pub reservation: Reservation,
    pub snapshot: PriceSnapshot,
}

#[async_trait]
pub trait PricingStore: Send + Sync {
    // ---- season rules ----

    async fn list_season_rules(&self) -> Result<Vec<SeasonRule>, StoreError>;

    /// Insert (`id = None`) or replace a season rule.
    async fn save_season_rule(
        &self,
        id: Option<DbId>,
        rule: &NewSeasonRule,
    ) -> Result<SeasonRule, StoreError>;

    // ---- modular catalog ----

    async fn find_modular_by_source(
        &self,
        source_item_id: DbId,
    ) -> Result<Option<ModularProduct>, StoreError>;

    /// Fails with `UniqueViolation` when `source_item_id` or `code` is taken.
    async fn insert_modular_product(
        &self,
        product: &NewModularProduct,
    ) -> Result<ModularProduct, StoreError>;

    async fn update_modular_price(&self, id: DbId, price: Decimal) -> Result<(), StoreError>;

    async fn set_modular_active(&self, id: DbId, is_active: bool) -> Result<(), StoreError>;

    async fn find_modular_products(&self, ids: &[DbId]) -> Result<Vec<ModularProduct>, StoreError>;

    async fn list_modular_products(&self) -> Result<Vec<ModularProduct>, StoreError>;

    // ---- packages ----

    async fn insert_package(&self, package: &NewPackage) -> Result<Package, StoreError>;

    async fn find_package(&self, id: DbId) -> Result<Option<Package>, StoreError>;

    async fn set_package_active(&self, id: DbId, is_active: bool) -> Result<(), StoreError>;

    /// Linked products in link order, including deactivated ones.
    async fn linked_products(&self, package_id: DbId) -> Result<Vec<ModularProduct>, StoreError>;

    /// Replace the package's link set in one transaction.
    async fn replace_package_links(
        &self,
        package_id: DbId,
        product_ids: &[DbId],
    ) -> Result<(), StoreError>;

    // ---- reservations ----

    /// Write header and lines atomically.
    async fn insert_reservation(
        &self,
        header: &NewReservation,
        snapshot: &PriceSnapshot,
    ) -> Result<Reservation, StoreError>;

    /// Delete the old line set and write the new header and lines atomically.
    ///
    /// Fails with `Conflict` when the stored header no longer matches
    /// `expected`.
    async fn replace_reservation(
        &self,
        id: DbId,
        expected: ReservationVersion,
        header: &NewReservation,
        snapshot: &PriceSnapshot,
    ) -> Result<Reservation, StoreError>;

    /// Set status and totals, checking `expected` in the same write.
    async fn update_reservation_status(
        &self,
        id: DbId,
        expected: ReservationVersion,
        status: ReservationStatus,
        totals: &Totals,
    ) -> Result<Reservation, StoreError>;

    /// Header and lines from one consistent read.
    async fn get_reservation(&self, id: DbId) -> Result<Option<StoredReservation>, StoreError>;
}
