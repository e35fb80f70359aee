//! Database queries for season rules, the modular catalog, packages and
//! reservations.
//!
//! Every function takes any Postgres executor so the same query runs against
//! the pool or inside a transaction (`&mut *tx`).

use rust_decimal::Decimal;
use sqlx::PgExecutor;

use crate::db::models::{
    ModularProductRow, PackageRow, ReservationLineRow, ReservationPackageLineRow, ReservationRow,
    SeasonRuleRow,
};
use crate::pricing::composer::{SnapshotLine, SnapshotPackageLine, Totals};
use crate::pricing::models::{
    DbId, NewModularProduct, NewPackage, NewReservation, NewSeasonRule, ReservationStatus,
};

const SEASON_RULE_COLUMNS: &str = r#"
    id, name, season_type, start_date, end_date, discount_percent,
    priority, applies_to_rooms, applies_to_programs, is_active
"#;

const MODULAR_PRODUCT_COLUMNS: &str = r#"
    id, code, name, price, category, source_item_id, is_active
"#;

const RESERVATION_COLUMNS: &str = r#"
    id, quote_id, client_ref, start_date, end_date, status, package_id,
    adjustment, grand_total, discount_amount, surcharge_amount, final_price,
    created_at, updated_at
"#;

/// Quantities are `INTEGER` columns; refuse to wrap instead of truncating.
fn quantity_column(quantity: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(quantity).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

// ---- season rules ----

/// Get all season rules, active or not
pub async fn list_season_rules<'e>(
    executor: impl PgExecutor<'e>,
) -> Result<Vec<SeasonRuleRow>, sqlx::Error> {
    sqlx::query_as::<_, SeasonRuleRow>(&format!(
        "SELECT {SEASON_RULE_COLUMNS} FROM season_rules ORDER BY start_date, id"
    ))
    .fetch_all(executor)
    .await
}

pub async fn insert_season_rule<'e>(
    executor: impl PgExecutor<'e>,
    rule: &NewSeasonRule,
) -> Result<SeasonRuleRow, sqlx::Error> {
    sqlx::query_as::<_, SeasonRuleRow>(&format!(
        r#"
        INSERT INTO season_rules (
            name, season_type, start_date, end_date, discount_percent,
            priority, applies_to_rooms, applies_to_programs, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {SEASON_RULE_COLUMNS}
        "#
    ))
    .bind(&rule.name)
    .bind(rule.season_type.as_str())
    .bind(rule.start_date)
    .bind(rule.end_date)
    .bind(rule.discount_percent)
    .bind(rule.priority)
    .bind(rule.applies_to_rooms)
    .bind(rule.applies_to_programs)
    .bind(rule.is_active)
    .fetch_one(executor)
    .await
}

/// Replace a season rule; `None` when the id does not exist
pub async fn update_season_rule<'e>(
    executor: impl PgExecutor<'e>,
    id: DbId,
    rule: &NewSeasonRule,
) -> Result<Option<SeasonRuleRow>, sqlx::Error> {
    sqlx::query_as::<_, SeasonRuleRow>(&format!(
        r#"
        UPDATE season_rules
        SET name = $2,
            season_type = $3,
            start_date = $4,
            end_date = $5,
            discount_percent = $6,
            priority = $7,
            applies_to_rooms = $8,
            applies_to_programs = $9,
            is_active = $10
        WHERE id = $1
        RETURNING {SEASON_RULE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&rule.name)
    .bind(rule.season_type.as_str())
    .bind(rule.start_date)
    .bind(rule.end_date)
    .bind(rule.discount_percent)
    .bind(rule.priority)
    .bind(rule.applies_to_rooms)
    .bind(rule.applies_to_programs)
    .bind(rule.is_active)
    .fetch_optional(executor)
    .await
}

// ---- modular catalog ----

pub async fn find_modular_by_source<'e>(
    executor: impl PgExecutor<'e>,
    source_item_id: DbId,
) -> Result<Option<ModularProductRow>, sqlx::Error> {
    sqlx::query_as::<_, ModularProductRow>(&format!(
        "SELECT {MODULAR_PRODUCT_COLUMNS} FROM modular_products WHERE source_item_id = $1"
    ))
    .bind(source_item_id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_modular_product<'e>(
    executor: impl PgExecutor<'e>,
    product: &NewModularProduct,
) -> Result<ModularProductRow, sqlx::Error> {
    sqlx::query_as::<_, ModularProductRow>(&format!(
        r#"
        INSERT INTO modular_products (code, name, price, category, source_item_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {MODULAR_PRODUCT_COLUMNS}
        "#
    ))
    .bind(&product.code)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.category.as_str())
    .bind(product.source_item_id)
    .fetch_one(executor)
    .await
}

/// Returns the number of rows touched (0 or 1)
pub async fn update_modular_price<'e>(
    executor: impl PgExecutor<'e>,
    id: DbId,
    price: Decimal,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE modular_products SET price = $2 WHERE id = $1")
        .bind(id)
        .bind(price)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn set_modular_active<'e>(
    executor: impl PgExecutor<'e>,
    id: DbId,
    is_active: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE modular_products SET is_active = $2 WHERE id = $1")
        .bind(id)
        .bind(is_active)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn find_modular_products<'e>(
    executor: impl PgExecutor<'e>,
    ids: &[DbId],
) -> Result<Vec<ModularProductRow>, sqlx::Error> {
    sqlx::query_as::<_, ModularProductRow>(&format!(
        "SELECT {MODULAR_PRODUCT_COLUMNS} FROM modular_products WHERE id = ANY($1) ORDER BY id"
    ))
    .bind(ids)
    .fetch_all(executor)
    .await
}

pub async fn list_modular_products<'e>(
    executor: impl PgExecutor<'e>,
) -> Result<Vec<ModularProductRow>, sqlx::Error> {
    sqlx::query_as::<_, ModularProductRow>(&format!(
        "SELECT {MODULAR_PRODUCT_COLUMNS} FROM modular_products ORDER BY id"
    ))
    .fetch_all(executor)
    .await
}

// ---- packages ----

pub async fn insert_package<'e>(
    executor: impl PgExecutor<'e>,
    package: &NewPackage,
) -> Result<PackageRow, sqlx::Error> {
    sqlx::query_as::<_, PackageRow>(
        r#"
        INSERT INTO packages (name, code, description)
        VALUES ($1, $2, $3)
        RETURNING id, name, code, description, is_active
        "#,
    )
    .bind(&package.name)
    .bind(&package.code)
    .bind(&package.description)
    .fetch_one(executor)
    .await
}

pub async fn find_package<'e>(
    executor: impl PgExecutor<'e>,
    id: DbId,
) -> Result<Option<PackageRow>, sqlx::Error> {
    sqlx::query_as::<_, PackageRow>(
        "SELECT id, name, code, description, is_active FROM packages WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn set_package_active<'e>(
    executor: impl PgExecutor<'e>,
    id: DbId,
    is_active: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE packages SET is_active = $2 WHERE id = $1")
        .bind(id)
        .bind(is_active)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Linked products in link order, including deactivated ones
pub async fn linked_products<'e>(
    executor: impl PgExecutor<'e>,
    package_id: DbId,
) -> Result<Vec<ModularProductRow>, sqlx::Error> {
    sqlx::query_as::<_, ModularProductRow>(
        r#"
        SELECT m.id, m.code, m.name, m.price, m.category, m.source_item_id, m.is_active
        FROM package_products pp
        JOIN modular_products m ON m.id = pp.modular_product_id
        WHERE pp.package_id = $1
        ORDER BY pp.sort_order
        "#,
    )
    .bind(package_id)
    .fetch_all(executor)
    .await
}

pub async fn delete_package_links<'e>(
    executor: impl PgExecutor<'e>,
    package_id: DbId,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM package_products WHERE package_id = $1")
        .bind(package_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn insert_package_link<'e>(
    executor: impl PgExecutor<'e>,
    package_id: DbId,
    modular_product_id: DbId,
    sort_order: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO package_products (package_id, modular_product_id, sort_order)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(package_id)
    .bind(modular_product_id)
    .bind(sort_order)
    .execute(executor)
    .await?;
    Ok(())
}

// ---- reservations ----

pub async fn insert_reservation<'e>(
    executor: impl PgExecutor<'e>,
    header: &NewReservation,
    adjustment: &serde_json::Value,
) -> Result<ReservationRow, sqlx::Error> {
    sqlx::query_as::<_, ReservationRow>(&format!(
        r#"
        INSERT INTO reservations (
            quote_id, client_ref, start_date, end_date, status, package_id,
            adjustment, grand_total, discount_amount, surcharge_amount, final_price
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {RESERVATION_COLUMNS}
        "#
    ))
    .bind(header.quote_id)
    .bind(&header.client_ref)
    .bind(header.start_date)
    .bind(header.end_date)
    .bind(header.status.as_str())
    .bind(header.package_id)
    .bind(adjustment)
    .bind(header.grand_total)
    .bind(header.discount_amount)
    .bind(header.surcharge_amount)
    .bind(header.final_price)
    .fetch_one(executor)
    .await
}

/// Overwrite a reservation header; `None` when the id does not exist
pub async fn update_reservation<'e>(
    executor: impl PgExecutor<'e>,
    id: DbId,
    header: &NewReservation,
    adjustment: &serde_json::Value,
) -> Result<Option<ReservationRow>, sqlx::Error> {
    sqlx::query_as::<_, ReservationRow>(&format!(
        r#"
        UPDATE reservations
        SET quote_id = $2,
            client_ref = $3,
            start_date = $4,
            end_date = $5,
            status = $6,
            package_id = $7,
            adjustment = $8,
            grand_total = $9,
            discount_amount = $10,
            surcharge_amount = $11,
            final_price = $12,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {RESERVATION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(header.quote_id)
    .bind(&header.client_ref)
    .bind(header.start_date)
    .bind(header.end_date)
    .bind(header.status.as_str())
    .bind(header.package_id)
    .bind(adjustment)
    .bind(header.grand_total)
    .bind(header.discount_amount)
    .bind(header.surcharge_amount)
    .bind(header.final_price)
    .fetch_optional(executor)
    .await
}

pub async fn update_reservation_status<'e>(
    executor: impl PgExecutor<'e>,
    id: DbId,
    status: ReservationStatus,
    totals: &Totals,
) -> Result<Option<ReservationRow>, sqlx::Error> {
    sqlx::query_as::<_, ReservationRow>(&format!(
        r#"
        UPDATE reservations
        SET status = $2,
            grand_total = $3,
            discount_amount = $4,
            surcharge_amount = $5,
            final_price = $6,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {RESERVATION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(totals.grand_total)
    .bind(totals.discount_amount)
    .bind(totals.surcharge_amount)
    .bind(totals.final_price)
    .fetch_optional(executor)
    .await
}

/// Read and row-lock a reservation header until the transaction ends
pub async fn lock_reservation<'e>(
    executor: impl PgExecutor<'e>,
    id: DbId,
) -> Result<Option<ReservationRow>, sqlx::Error> {
    sqlx::query_as::<_, ReservationRow>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Make the current transaction read header and lines from one snapshot.
/// Must be the first statement of the transaction.
pub async fn begin_snapshot_read<'e>(executor: impl PgExecutor<'e>) -> Result<(), sqlx::Error> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn get_reservation<'e>(
    executor: impl PgExecutor<'e>,
    id: DbId,
) -> Result<Option<ReservationRow>, sqlx::Error> {
    sqlx::query_as::<_, ReservationRow>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn delete_reservation_lines<'e>(
    executor: impl PgExecutor<'e>,
    reservation_id: DbId,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        WITH gone AS (
            DELETE FROM reservation_lines WHERE reservation_id = $1
        )
        DELETE FROM reservation_package_lines WHERE reservation_id = $1
        "#,
    )
    .bind(reservation_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn insert_reservation_line<'e>(
    executor: impl PgExecutor<'e>,
    reservation_id: DbId,
    position: i32,
    line: &SnapshotLine,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO reservation_lines (
            reservation_id, position, stay_date, audience, reference,
            base_price, unit_price, quantity, season_rule_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(reservation_id)
    .bind(position)
    .bind(line.date)
    .bind(line.audience.as_str())
    .bind(&line.reference)
    .bind(line.base_price)
    .bind(line.unit_price)
    .bind(quantity_column(line.quantity)?)
    .bind(line.season_rule_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn insert_reservation_package_line<'e>(
    executor: impl PgExecutor<'e>,
    reservation_id: DbId,
    position: i32,
    line: &SnapshotPackageLine,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO reservation_package_lines (
            reservation_id, position, modular_product_id, code, name,
            unit_price, quantity, flagged
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(reservation_id)
    .bind(position)
    .bind(line.modular_product_id)
    .bind(&line.code)
    .bind(&line.name)
    .bind(line.unit_price)
    .bind(quantity_column(line.quantity)?)
    .bind(line.flagged)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn reservation_lines<'e>(
    executor: impl PgExecutor<'e>,
    reservation_id: DbId,
) -> Result<Vec<ReservationLineRow>, sqlx::Error> {
    sqlx::query_as::<_, ReservationLineRow>(
        r#"
        SELECT stay_date, audience, reference, base_price, unit_price, quantity, season_rule_id
        FROM reservation_lines
        WHERE reservation_id = $1
        ORDER BY position
        "#,
    )
    .bind(reservation_id)
    .fetch_all(executor)
    .await
}

pub async fn reservation_package_lines<'e>(
    executor: impl PgExecutor<'e>,
    reservation_id: DbId,
) -> Result<Vec<ReservationPackageLineRow>, sqlx::Error> {
    sqlx::query_as::<_, ReservationPackageLineRow>(
        r#"
        SELECT modular_product_id, code, name, unit_price, quantity, flagged
        FROM reservation_package_lines
        WHERE reservation_id = $1
        ORDER BY position
        "#,
    )
    .bind(reservation_id)
    .fetch_all(executor)
    .await
}
