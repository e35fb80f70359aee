//! Domain models for the pricing engine.
//!
//! Database rows live in `crate::db::models` and convert into these types;
//! nothing here knows about sqlx.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary key type shared by every table.
pub type DbId = i64;

/// Who a season rule (or a selection) prices: rooms or programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Room,
    Program,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Room => "room",
            Audience::Program => "program",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "room" => Ok(Audience::Room),
            "program" => Ok(Audience::Program),
            other => Err(format!("unknown audience '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonType {
    Low,
    Mid,
    High,
}

impl SeasonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonType::Low => "low",
            SeasonType::Mid => "mid",
            SeasonType::High => "high",
        }
    }
}

impl FromStr for SeasonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(SeasonType::Low),
            "mid" => Ok(SeasonType::Mid),
            "high" => Ok(SeasonType::High),
            other => Err(format!("unknown season type '{}'", other)),
        }
    }
}

/// A dated, prioritized price adjustment.
///
/// `discount_percent` is signed: positive values discount, negative values
/// surcharge. Both date bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRule {
    pub id: DbId,
    pub name: String,
    pub season_type: SeasonType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_percent: Decimal,
    pub priority: i32,
    pub applies_to_rooms: bool,
    pub applies_to_programs: bool,
    pub is_active: bool,
}

impl SeasonRule {
    /// Check if the rule's date range contains `date`
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn applies_to(&self, audience: Audience) -> bool {
        match audience {
            Audience::Room => self.applies_to_rooms,
            Audience::Program => self.applies_to_programs,
        }
    }

    /// Length of the date range in days (`end_date - start_date`).
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// Administrative input for creating or replacing a season rule.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSeasonRule {
    pub name: String,
    pub season_type: SeasonType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_percent: Decimal,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub applies_to_rooms: bool,
    #[serde(default)]
    pub applies_to_programs: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_priority() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

/// A sellable item supplied by the product catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub id: DbId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Grouping used to present modular products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModularCategory {
    Lodging,
    Food,
    Spa,
    Entertainment,
    Services,
}

impl ModularCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModularCategory::Lodging => "lodging",
            ModularCategory::Food => "food",
            ModularCategory::Spa => "spa",
            ModularCategory::Entertainment => "entertainment",
            ModularCategory::Services => "services",
        }
    }
}

impl FromStr for ModularCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lodging" => Ok(ModularCategory::Lodging),
            "food" => Ok(ModularCategory::Food),
            "spa" => Ok(ModularCategory::Spa),
            "entertainment" => Ok(ModularCategory::Entertainment),
            "services" => Ok(ModularCategory::Services),
            other => Err(format!("unknown modular category '{}'", other)),
        }
    }
}

/// Mirror of a catalog item used for package composition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModularProduct {
    pub id: DbId,
    pub code: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub category: ModularCategory,
    pub source_item_id: Option<DbId>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewModularProduct {
    pub code: String,
    pub name: String,
    pub price: Decimal,
    pub category: ModularCategory,
    pub source_item_id: Option<DbId>,
}

/// A named, fixed bundle of modular products.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPackage {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Reservation lifecycle.
///
/// `Draft -> Confirmed -> (Modified -> Confirmed)* -> Cancelled | Completed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Draft,
    Confirmed,
    Modified,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Draft => "draft",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Modified => "modified",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// `Modified` is only reachable through line replacement, so it is not a
    /// valid target here; see `can_replace_lines`.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        match (self, next) {
            (Draft | Modified, Confirmed) => true,
            (Draft | Confirmed | Modified, Cancelled) => true,
            (Confirmed, Completed) => true,
            _ => false,
        }
    }

    pub fn can_replace_lines(&self) -> bool {
        !self.is_terminal()
    }

    /// Status after a line replacement. Drafts stay drafts.
    pub fn after_replacement(&self) -> ReservationStatus {
        match self {
            ReservationStatus::Draft => ReservationStatus::Draft,
            _ => ReservationStatus::Modified,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ReservationStatus::Draft),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "modified" => Ok(ReservationStatus::Modified),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            "completed" => Ok(ReservationStatus::Completed),
            other => Err(format!("unknown reservation status '{}'", other)),
        }
    }
}

/// How a reservation-level adjustment component is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Percentage,
    FixedAmount,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Percentage => "percentage",
            AdjustmentKind::FixedAmount => "fixed_amount",
        }
    }
}

impl FromStr for AdjustmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(AdjustmentKind::Percentage),
            "fixed_amount" => Ok(AdjustmentKind::FixedAmount),
            other => Err(format!("unknown adjustment kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentComponent {
    pub kind: AdjustmentKind,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Reservation-level discount and surcharge, applied once to the grand total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationAdjustment {
    #[serde(default)]
    pub discount: Option<AdjustmentComponent>,
    #[serde(default)]
    pub surcharge: Option<AdjustmentComponent>,
}

/// Persisted reservation header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub id: DbId,
    pub quote_id: Uuid,
    pub client_ref: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ReservationStatus,
    pub package_id: Option<DbId>,
    pub adjustment: ReservationAdjustment,
    #[serde(with = "rust_decimal::serde::str")]
    pub grand_total: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub surcharge_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub final_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Header fields written together with a line set.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub quote_id: Uuid,
    pub client_ref: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ReservationStatus,
    pub package_id: Option<DbId>,
    pub adjustment: ReservationAdjustment,
    pub grand_total: Decimal,
    pub discount_amount: Decimal,
    pub surcharge_amount: Decimal,
    pub final_price: Decimal,
}
