//! Database rows for the pricing tables.
//!
//! These models use sqlx's FromRow derive for direct database
//! deserialization. Enum columns are stored as TEXT and parsed on the way
//! out; a value the domain does not know is an `InvalidRow`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::pricing::composer::{SnapshotLine, SnapshotPackageLine};
use crate::pricing::models::{
    DbId, ModularProduct, Package, Reservation, ReservationAdjustment, SeasonRule,
};
use crate::store::StoreError;

fn parse<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T, StoreError> {
    value.parse().map_err(StoreError::InvalidRow)
}

fn quantity(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::InvalidRow(format!("negative quantity {}", value)))
}

/// Row from season_rules
#[derive(Debug, Clone, FromRow)]
pub struct SeasonRuleRow {
    pub id: DbId,
    pub name: String,
    pub season_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub discount_percent: Decimal,
    pub priority: i32,
    pub applies_to_rooms: bool,
    pub applies_to_programs: bool,
    pub is_active: bool,
}

impl TryFrom<SeasonRuleRow> for SeasonRule {
    type Error = StoreError;

    fn try_from(row: SeasonRuleRow) -> Result<Self, Self::Error> {
        Ok(SeasonRule {
            id: row.id,
            name: row.name,
            season_type: parse(&row.season_type)?,
            start_date: row.start_date,
            end_date: row.end_date,
            discount_percent: row.discount_percent,
            priority: row.priority,
            applies_to_rooms: row.applies_to_rooms,
            applies_to_programs: row.applies_to_programs,
            is_active: row.is_active,
        })
    }
}

/// Row from modular_products
#[derive(Debug, Clone, FromRow)]
pub struct ModularProductRow {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub source_item_id: Option<DbId>,
    pub is_active: bool,
}

impl TryFrom<ModularProductRow> for ModularProduct {
    type Error = StoreError;

    fn try_from(row: ModularProductRow) -> Result<Self, Self::Error> {
        Ok(ModularProduct {
            id: row.id,
            code: row.code,
            name: row.name,
            price: row.price,
            category: parse(&row.category)?,
            source_item_id: row.source_item_id,
            is_active: row.is_active,
        })
    }
}

/// Row from packages
#[derive(Debug, Clone, FromRow)]
pub struct PackageRow {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            id: row.id,
            name: row.name,
            code: row.code,
            description: row.description,
            is_active: row.is_active,
        }
    }
}

/// Row from reservations
#[derive(Debug, Clone, FromRow)]
pub struct ReservationRow {
    pub id: DbId,
    pub quote_id: Uuid,
    pub client_ref: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub package_id: Option<DbId>,
    pub adjustment: serde_json::Value,
    pub grand_total: Decimal,
    pub discount_amount: Decimal,
    pub surcharge_amount: Decimal,
    pub final_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let adjustment: ReservationAdjustment = serde_json::from_value(row.adjustment)
            .map_err(|e| StoreError::InvalidRow(format!("reservation {} adjustment: {}", row.id, e)))?;

        Ok(Reservation {
            id: row.id,
            quote_id: row.quote_id,
            client_ref: row.client_ref,
            start_date: row.start_date,
            end_date: row.end_date,
            status: parse(&row.status)?,
            package_id: row.package_id,
            adjustment,
            grand_total: row.grand_total,
            discount_amount: row.discount_amount,
            surcharge_amount: row.surcharge_amount,
            final_price: row.final_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row from reservation_lines
#[derive(Debug, Clone, FromRow)]
pub struct ReservationLineRow {
    pub stay_date: NaiveDate,
    pub audience: String,
    pub reference: String,
    pub base_price: Decimal,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub season_rule_id: Option<DbId>,
}

impl TryFrom<ReservationLineRow> for SnapshotLine {
    type Error = StoreError;

    fn try_from(row: ReservationLineRow) -> Result<Self, Self::Error> {
        Ok(SnapshotLine {
            date: row.stay_date,
            audience: parse(&row.audience)?,
            reference: row.reference,
            base_price: row.base_price,
            unit_price: row.unit_price,
            quantity: quantity(row.quantity)?,
            season_rule_id: row.season_rule_id,
        })
    }
}

/// Row from reservation_package_lines
#[derive(Debug, Clone, FromRow)]
pub struct ReservationPackageLineRow {
    pub modular_product_id: DbId,
    pub code: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub flagged: bool,
}

impl TryFrom<ReservationPackageLineRow> for SnapshotPackageLine {
    type Error = StoreError;

    fn try_from(row: ReservationPackageLineRow) -> Result<Self, Self::Error> {
        Ok(SnapshotPackageLine {
            modular_product_id: row.modular_product_id,
            code: row.code,
            name: row.name,
            unit_price: row.unit_price,
            quantity: quantity(row.quantity)?,
            flagged: row.flagged,
        })
    }
}
