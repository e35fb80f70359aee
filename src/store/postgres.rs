//! PostgreSQL `PricingStore`.
//!
//! Multi-row writes (link replacement, reservation header plus lines) run
//! inside one transaction; dropping the transaction on error rolls it back.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgConnection;

use super::{PricingStore, ReservationVersion, StoreError, StoredReservation};
use crate::db::{queries, DbPool};
use crate::pricing::composer::{PriceSnapshot, Totals};
use crate::pricing::models::{
    DbId, ModularProduct, NewModularProduct, NewPackage, NewReservation, NewSeasonRule, Package,
    Reservation, ReservationStatus, SeasonRule,
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn adjustment_json(header: &NewReservation) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(&header.adjustment)
        .map_err(|e| StoreError::InvalidRow(format!("adjustment: {}", e)))
}

fn rows_into<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

async fn write_lines(
    conn: &mut PgConnection,
    reservation_id: DbId,
    snapshot: &PriceSnapshot,
) -> Result<(), StoreError> {
    for (position, line) in snapshot.lines.iter().enumerate() {
        queries::insert_reservation_line(&mut *conn, reservation_id, position as i32, line).await?;
    }
    for (position, line) in snapshot.package_lines.iter().enumerate() {
        queries::insert_reservation_package_line(&mut *conn, reservation_id, position as i32, line)
            .await?;
    }
    Ok(())
}

/// Lock the header row and check it still matches `expected`.
async fn lock_version(
    conn: &mut PgConnection,
    id: DbId,
    expected: ReservationVersion,
) -> Result<(), StoreError> {
    let current: Reservation = queries::lock_reservation(&mut *conn, id)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "reservation",
            id,
        })?
        .try_into()?;
    if ReservationVersion::of(&current) != expected {
        return Err(StoreError::Conflict {
            entity: "reservation",
            id,
        });
    }
    Ok(())
}

#[async_trait]
impl PricingStore for PgStore {
    async fn list_season_rules(&self) -> Result<Vec<SeasonRule>, StoreError> {
        rows_into(queries::list_season_rules(&self.pool).await?)
    }

    async fn save_season_rule(
        &self,
        id: Option<DbId>,
        rule: &NewSeasonRule,
    ) -> Result<SeasonRule, StoreError> {
        let row = match id {
            None => queries::insert_season_rule(&self.pool, rule).await?,
            Some(id) => queries::update_season_rule(&self.pool, id, rule)
                .await?
                .ok_or(StoreError::NotFound {
                    entity: "season rule",
                    id,
                })?,
        };
        row.try_into()
    }

    async fn find_modular_by_source(
        &self,
        source_item_id: DbId,
    ) -> Result<Option<ModularProduct>, StoreError> {
        queries::find_modular_by_source(&self.pool, source_item_id)
            .await?
            .map(ModularProduct::try_from)
            .transpose()
    }

    async fn insert_modular_product(
        &self,
        product: &NewModularProduct,
    ) -> Result<ModularProduct, StoreError> {
        queries::insert_modular_product(&self.pool, product)
            .await?
            .try_into()
    }

    async fn update_modular_price(&self, id: DbId, price: Decimal) -> Result<(), StoreError> {
        match queries::update_modular_price(&self.pool, id, price).await? {
            0 => Err(StoreError::NotFound {
                entity: "modular product",
                id,
            }),
            _ => Ok(()),
        }
    }

    async fn set_modular_active(&self, id: DbId, is_active: bool) -> Result<(), StoreError> {
        match queries::set_modular_active(&self.pool, id, is_active).await? {
            0 => Err(StoreError::NotFound {
                entity: "modular product",
                id,
            }),
            _ => Ok(()),
        }
    }

    async fn find_modular_products(&self, ids: &[DbId]) -> Result<Vec<ModularProduct>, StoreError> {
        rows_into(queries::find_modular_products(&self.pool, ids).await?)
    }

    async fn list_modular_products(&self) -> Result<Vec<ModularProduct>, StoreError> {
        rows_into(queries::list_modular_products(&self.pool).await?)
    }

    async fn insert_package(&self, package: &NewPackage) -> Result<Package, StoreError> {
        Ok(queries::insert_package(&self.pool, package).await?.into())
    }

    async fn find_package(&self, id: DbId) -> Result<Option<Package>, StoreError> {
        Ok(queries::find_package(&self.pool, id).await?.map(Package::from))
    }

    async fn set_package_active(&self, id: DbId, is_active: bool) -> Result<(), StoreError> {
        match queries::set_package_active(&self.pool, id, is_active).await? {
            0 => Err(StoreError::NotFound {
                entity: "package",
                id,
            }),
            _ => Ok(()),
        }
    }

    async fn linked_products(&self, package_id: DbId) -> Result<Vec<ModularProduct>, StoreError> {
        rows_into(queries::linked_products(&self.pool, package_id).await?)
    }

    async fn replace_package_links(
        &self,
        package_id: DbId,
        product_ids: &[DbId],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        queries::delete_package_links(&mut *tx, package_id).await?;
        for (sort_order, product_id) in product_ids.iter().enumerate() {
            queries::insert_package_link(&mut *tx, package_id, *product_id, sort_order as i32)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_reservation(
        &self,
        header: &NewReservation,
        snapshot: &PriceSnapshot,
    ) -> Result<Reservation, StoreError> {
        let adjustment = adjustment_json(header)?;

        let mut tx = self.pool.begin().await?;
        let row = queries::insert_reservation(&mut *tx, header, &adjustment).await?;
        write_lines(&mut tx, row.id, snapshot).await?;
        tx.commit().await?;

        tracing::debug!(reservation_id = row.id, lines = snapshot.lines.len(), "Reservation written");
        row.try_into()
    }

    async fn replace_reservation(
        &self,
        id: DbId,
        expected: ReservationVersion,
        header: &NewReservation,
        snapshot: &PriceSnapshot,
    ) -> Result<Reservation, StoreError> {
        let adjustment = adjustment_json(header)?;

        let mut tx = self.pool.begin().await?;
        lock_version(&mut tx, id, expected).await?;
        let row = queries::update_reservation(&mut *tx, id, header, &adjustment)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "reservation",
                id,
            })?;
        queries::delete_reservation_lines(&mut *tx, id).await?;
        write_lines(&mut tx, id, snapshot).await?;
        tx.commit().await?;

        row.try_into()
    }

    async fn update_reservation_status(
        &self,
        id: DbId,
        expected: ReservationVersion,
        status: ReservationStatus,
        totals: &Totals,
    ) -> Result<Reservation, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_version(&mut tx, id, expected).await?;
        let row = queries::update_reservation_status(&mut *tx, id, status, totals)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "reservation",
                id,
            })?;
        tx.commit().await?;

        row.try_into()
    }

    async fn get_reservation(&self, id: DbId) -> Result<Option<StoredReservation>, StoreError> {
        let mut tx = self.pool.begin().await?;
        queries::begin_snapshot_read(&mut *tx).await?;

        let Some(row) = queries::get_reservation(&mut *tx, id).await? else {
            return Ok(None);
        };
        let lines = rows_into(queries::reservation_lines(&mut *tx, id).await?)?;
        let package_lines = rows_into(queries::reservation_package_lines(&mut *tx, id).await?)?;
        tx.commit().await?;

        Ok(Some(StoredReservation {
            reservation: row.try_into()?,
            snapshot: PriceSnapshot {
                lines,
                package_lines,
            },
        }))
    }
}
