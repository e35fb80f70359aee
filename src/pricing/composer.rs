//! Reservation price composition.
//!
//! Walks every night of a stay for every selection, resolves the season rule
//! for that night, adds package content once per stay and applies the
//! reservation-level adjustment last. The result is a live
//! `ReservationQuote`; `ReservationQuote::freeze` copies its prices into the
//! `PriceSnapshot` that gets persisted. Totals for both are produced by the
//! same function, so what was displayed is what gets stored.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::calculators::{
    apply_adjustment, checked_sum, daily_price, line_total, nights, round_money, validate_adjustment,
};
use crate::pricing::error::PricingError;
use crate::pricing::models::{Audience, DbId, ReservationAdjustment, SeasonType};
use crate::pricing::packages::PackageExpansion;
use crate::pricing::seasons::SeasonRuleSet;

/// Longest stay a single quote may price, unless configured otherwise.
pub const DEFAULT_MAX_STAY_NIGHTS: u32 = 365;

/// Largest per-selection quantity; the store keeps quantities as `INTEGER`.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// Knobs shared by every composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingSettings {
    /// Decimal places of the smallest currency unit
    pub currency_places: u32,
    pub max_stay_nights: u32,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            currency_places: 2,
            max_stay_nights: DEFAULT_MAX_STAY_NIGHTS,
        }
    }
}

/// A validated stay: `start < end`, checkout night excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl StayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PricingError> {
        if end <= start {
            return Err(PricingError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn nights(&self) -> u32 {
        (self.end - self.start).num_days() as u32
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        nights(self.start, self.end)
    }
}

/// One priced room or program in a stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub audience: Audience,
    /// Room or program reference, opaque to the engine.
    pub reference: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price_per_night: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Advisory findings attached to a quote. None of these fail the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuoteWarning {
    /// Several rules tied on priority and span; the lowest id was used.
    AmbiguousSeasonRule {
        date: NaiveDate,
        audience: Audience,
        selected_rule_id: DbId,
        tied_rule_ids: Vec<DbId>,
    },
    /// A rule's percentage was outside `[-100, 100]` and was clamped.
    DiscountClamped {
        rule_id: DbId,
        #[serde(with = "rust_decimal::serde::str")]
        configured_percent: Decimal,
    },
    /// A package links a deactivated product; it is listed with quantity 0.
    StaleLinkedProduct { modular_product_id: DbId, code: String },
}

/// Live per-night line of a quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteLine {
    pub date: NaiveDate,
    pub audience: Audience,
    pub reference: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    pub quantity: u32,
    pub season_rule_id: Option<DbId>,
    pub season_name: Option<String>,
    pub season_type: Option<SeasonType>,
}

impl QuoteLine {
    pub fn line_total(&self) -> Result<Decimal, PricingError> {
        line_total(self.unit_price, self.quantity)
    }
}

/// Live package add-on line of a quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageQuoteLine {
    pub modular_product_id: DbId,
    pub code: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    pub quantity: u32,
    pub flagged: bool,
}

impl PackageQuoteLine {
    pub fn line_total(&self) -> Result<Decimal, PricingError> {
        line_total(self.unit_price, self.quantity)
    }
}

/// Frozen per-night price, immune to later season rule edits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotLine {
    pub date: NaiveDate,
    pub audience: Audience,
    pub reference: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    pub quantity: u32,
    pub season_rule_id: Option<DbId>,
}

/// Frozen package line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotPackageLine {
    pub modular_product_id: DbId,
    pub code: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    pub quantity: u32,
    pub flagged: bool,
}

/// Line prices as persisted with a reservation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSnapshot {
    pub lines: Vec<SnapshotLine>,
    pub package_lines: Vec<SnapshotPackageLine>,
}

/// Reservation totals derived from a line set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    #[serde(with = "rust_decimal::serde::str")]
    pub grand_total: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub surcharge_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub final_price: Decimal,
}

/// The only place totals are computed.
///
/// Rounds once, after summing every unrounded line, then applies the
/// reservation-level adjustment to the rounded grand total.
pub fn compute_totals(
    lines_subtotal: Decimal,
    package_subtotal: Decimal,
    adjustment: &ReservationAdjustment,
    places: u32,
) -> Result<Totals, PricingError> {
    let grand_total = round_money(
        checked_sum([lines_subtotal, package_subtotal], "grand total")?,
        places,
    );
    let breakdown = apply_adjustment(grand_total, adjustment, places)?;
    Ok(Totals {
        grand_total,
        discount_amount: breakdown.discount_amount,
        surcharge_amount: breakdown.surcharge_amount,
        final_price: breakdown.final_price,
    })
}

impl PriceSnapshot {
    pub fn lines_subtotal(&self) -> Result<Decimal, PricingError> {
        let totals = self
            .lines
            .iter()
            .map(|l| line_total(l.unit_price, l.quantity))
            .collect::<Result<Vec<_>, _>>()?;
        checked_sum(totals, "lines subtotal")
    }

    pub fn package_subtotal(&self) -> Result<Decimal, PricingError> {
        let totals = self
            .package_lines
            .iter()
            .map(|l| line_total(l.unit_price, l.quantity))
            .collect::<Result<Vec<_>, _>>()?;
        checked_sum(totals, "package subtotal")
    }

    /// Recompute totals from scratch out of the frozen lines.
    pub fn totals(
        &self,
        adjustment: &ReservationAdjustment,
        places: u32,
    ) -> Result<Totals, PricingError> {
        compute_totals(self.lines_subtotal()?, self.package_subtotal()?, adjustment, places)
    }
}

/// Fully computed, not yet persisted price breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationQuote {
    pub quote_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nights: u32,
    pub lines: Vec<QuoteLine>,
    pub package_id: Option<DbId>,
    pub package_lines: Vec<PackageQuoteLine>,
    #[serde(with = "rust_decimal::serde::str")]
    pub lines_subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub package_subtotal: Decimal,
    pub adjustment: ReservationAdjustment,
    #[serde(flatten)]
    pub totals: Totals,
    pub warnings: Vec<QuoteWarning>,
}

impl ReservationQuote {
    /// Copy the quote's prices into the value that gets persisted.
    pub fn freeze(&self) -> PriceSnapshot {
        PriceSnapshot {
            lines: self
                .lines
                .iter()
                .map(|l| SnapshotLine {
                    date: l.date,
                    audience: l.audience,
                    reference: l.reference.clone(),
                    base_price: l.base_price,
                    unit_price: l.unit_price,
                    quantity: l.quantity,
                    season_rule_id: l.season_rule_id,
                })
                .collect(),
            package_lines: self
                .package_lines
                .iter()
                .map(|l| SnapshotPackageLine {
                    modular_product_id: l.modular_product_id,
                    code: l.code.clone(),
                    name: l.name.clone(),
                    unit_price: l.unit_price,
                    quantity: l.quantity,
                    flagged: l.flagged,
                })
                .collect(),
        }
    }
}

fn validate_selections(
    selections: &[Selection],
    package: Option<&PackageExpansion>,
) -> Result<(), PricingError> {
    if selections.is_empty() && package.is_none() {
        return Err(PricingError::InvalidSelection(
            "at least one room, program or package is required".to_string(),
        ));
    }
    for selection in selections {
        if selection.quantity == 0 || selection.quantity > MAX_QUANTITY {
            return Err(PricingError::InvalidSelection(format!(
                "quantity for '{}' must be between 1 and {}",
                selection.reference, MAX_QUANTITY
            )));
        }
        if selection.base_price_per_night < Decimal::ZERO {
            return Err(PricingError::InvalidSelection(format!(
                "base price for '{}' must not be negative",
                selection.reference
            )));
        }
    }
    Ok(())
}

/// Composes quotes against one season rule snapshot.
pub struct ReservationComposer<'a> {
    rules: &'a SeasonRuleSet,
    settings: PricingSettings,
}

impl<'a> ReservationComposer<'a> {
    pub fn new(rules: &'a SeasonRuleSet, settings: PricingSettings) -> Self {
        Self { rules, settings }
    }

    pub fn compose(
        &self,
        stay: &StayRange,
        selections: &[Selection],
        package: Option<&PackageExpansion>,
        adjustment: &ReservationAdjustment,
    ) -> Result<ReservationQuote, PricingError> {
        if stay.nights() > self.settings.max_stay_nights {
            return Err(PricingError::StayTooLong {
                nights: stay.nights(),
                max_nights: self.settings.max_stay_nights,
            });
        }
        validate_selections(selections, package)?;
        validate_adjustment(adjustment)?;
        if let Some(expansion) = package {
            if !expansion.package.is_active {
                return Err(PricingError::InactivePackage(expansion.package.id));
            }
        }

        let mut warnings = Vec::new();
        let mut ambiguous_seen: HashSet<(NaiveDate, Audience)> = HashSet::new();
        let mut clamped_seen: HashSet<DbId> = HashSet::new();
        let mut lines = Vec::with_capacity(stay.nights() as usize * selections.len());

        for date in stay.dates() {
            for selection in selections {
                let resolution = self.rules.resolve(date, selection.audience);

                if let Some(rule) = resolution.rule {
                    if resolution.is_ambiguous() && ambiguous_seen.insert((date, selection.audience)) {
                        tracing::warn!(
                            %date,
                            audience = %selection.audience,
                            rule_id = rule.id,
                            tied = ?resolution.tied_with,
                            "Ambiguous season rules, lowest id selected"
                        );
                        warnings.push(QuoteWarning::AmbiguousSeasonRule {
                            date,
                            audience: selection.audience,
                            selected_rule_id: rule.id,
                            tied_rule_ids: resolution.tied_with.clone(),
                        });
                    }
                }

                let price = daily_price(selection.base_price_per_night, resolution.rule)?;
                if let (true, Some(rule)) = (price.clamped, resolution.rule) {
                    if clamped_seen.insert(rule.id) {
                        tracing::warn!(
                            rule_id = rule.id,
                            percent = %rule.discount_percent,
                            "Season rule percentage out of range, clamped"
                        );
                        warnings.push(QuoteWarning::DiscountClamped {
                            rule_id: rule.id,
                            configured_percent: rule.discount_percent,
                        });
                    }
                }

                lines.push(QuoteLine {
                    date,
                    audience: selection.audience,
                    reference: selection.reference.clone(),
                    base_price: price.base_price,
                    unit_price: price.final_price,
                    quantity: selection.quantity,
                    season_rule_id: resolution.rule.map(|r| r.id),
                    season_name: resolution.rule.map(|r| r.name.clone()),
                    season_type: resolution.rule.map(|r| r.season_type),
                });
            }
        }

        let mut package_lines = Vec::new();
        if let Some(expansion) = package {
            for linked in &expansion.products {
                if linked.stale {
                    warnings.push(QuoteWarning::StaleLinkedProduct {
                        modular_product_id: linked.product.id,
                        code: linked.product.code.clone(),
                    });
                }
                package_lines.push(PackageQuoteLine {
                    modular_product_id: linked.product.id,
                    code: linked.product.code.clone(),
                    name: linked.product.name.clone(),
                    unit_price: linked.product.price,
                    quantity: if linked.stale { 0 } else { 1 },
                    flagged: linked.stale,
                });
            }
        }

        let lines_subtotal = checked_sum(
            lines.iter().map(QuoteLine::line_total).collect::<Result<Vec<_>, _>>()?,
            "lines subtotal",
        )?;
        let package_subtotal = checked_sum(
            package_lines
                .iter()
                .map(PackageQuoteLine::line_total)
                .collect::<Result<Vec<_>, _>>()?,
            "package subtotal",
        )?;
        let totals = compute_totals(
            lines_subtotal,
            package_subtotal,
            adjustment,
            self.settings.currency_places,
        )?;

        tracing::debug!(
            nights = stay.nights(),
            lines = lines.len(),
            package_lines = package_lines.len(),
            grand_total = %totals.grand_total,
            final_price = %totals.final_price,
            "Composed reservation quote"
        );

        Ok(ReservationQuote {
            quote_id: Uuid::new_v4(),
            start_date: stay.start(),
            end_date: stay.end(),
            nights: stay.nights(),
            lines,
            package_id: package.map(|p| p.package.id),
            package_lines,
            lines_subtotal,
            package_subtotal,
            adjustment: adjustment.clone(),
            totals,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::{
        AdjustmentComponent, AdjustmentKind, ModularCategory, ModularProduct, Package, SeasonRule,
    };
    use crate::pricing::packages::LinkedProduct;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn room(base: Decimal) -> Selection {
        Selection {
            audience: Audience::Room,
            reference: "101".to_string(),
            base_price_per_night: base,
            quantity: 1,
        }
    }

    fn low_season() -> SeasonRule {
        SeasonRule {
            id: 1,
            name: "Temporada baja".to_string(),
            season_type: SeasonType::Low,
            start_date: date(1, 1),
            end_date: date(3, 31),
            discount_percent: dec!(10),
            priority: 1,
            applies_to_rooms: true,
            applies_to_programs: false,
            is_active: true,
        }
    }

    fn high_season() -> SeasonRule {
        SeasonRule {
            id: 2,
            name: "Fin de semana largo".to_string(),
            season_type: SeasonType::High,
            start_date: date(2, 10),
            end_date: date(2, 20),
            discount_percent: dec!(-20),
            priority: 5,
            applies_to_rooms: true,
            applies_to_programs: false,
            is_active: true,
        }
    }

    fn product(id: DbId, price: Decimal, active: bool) -> ModularProduct {
        ModularProduct {
            id,
            code: format!("P_{}", id),
            name: format!("Product {}", id),
            price,
            category: ModularCategory::Services,
            source_item_id: Some(id),
            is_active: active,
        }
    }

    fn expansion(products: Vec<ModularProduct>) -> PackageExpansion {
        PackageExpansion {
            package: Package {
                id: 10,
                name: "Relax".to_string(),
                code: "PKG-RELAX".to_string(),
                description: None,
                is_active: true,
            },
            products: products
                .into_iter()
                .map(|p| LinkedProduct {
                    stale: !p.is_active,
                    product: p,
                })
                .collect(),
        }
    }

    #[test]
    fn invalid_range_is_rejected_before_resolution() {
        assert_matches!(
            StayRange::new(date(2, 5), date(2, 5)),
            Err(PricingError::InvalidDateRange { .. })
        );
        assert_matches!(
            StayRange::new(date(2, 6), date(2, 5)),
            Err(PricingError::InvalidDateRange { .. })
        );
    }

    #[test]
    fn three_night_stay_with_package_and_no_season() {
        let rules = SeasonRuleSet::default();
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(6, 1), date(6, 4)).unwrap();
        let package = expansion(vec![product(1, dec!(30), true), product(2, dec!(20), true)]);

        let quote = composer
            .compose(&stay, &[room(dec!(100))], Some(&package), &ReservationAdjustment::default())
            .unwrap();

        assert_eq!(quote.lines.len(), 3);
        assert_eq!(quote.lines_subtotal, dec!(300));
        assert_eq!(quote.package_subtotal, dec!(50));
        assert_eq!(quote.totals.grand_total, dec!(350));
        assert_eq!(quote.totals.final_price, dec!(350));
        assert!(quote.warnings.is_empty());
    }

    #[test]
    fn line_count_equals_nights_per_selection() {
        let rules = SeasonRuleSet::new(vec![low_season()]);
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(1, 28), date(2, 4)).unwrap();
        let program = Selection {
            audience: Audience::Program,
            reference: "spa-weekend".to_string(),
            base_price_per_night: dec!(50),
            quantity: 2,
        };

        let quote = composer
            .compose(&stay, &[room(dec!(100)), program], None, &ReservationAdjustment::default())
            .unwrap();

        assert_eq!(quote.nights, 7);
        assert_eq!(quote.lines.len(), 14);
        assert_eq!(
            quote.lines.iter().filter(|l| l.audience == Audience::Program).count(),
            7
        );
        assert!(quote.lines.iter().all(|l| l.date < stay.end()));
    }

    #[test]
    fn nights_cross_season_boundary() {
        let rules = SeasonRuleSet::new(vec![low_season(), high_season()]);
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(2, 8), date(2, 12)).unwrap();

        let quote = composer
            .compose(&stay, &[room(dec!(100))], None, &ReservationAdjustment::default())
            .unwrap();

        let prices: Vec<_> = quote.lines.iter().map(|l| l.unit_price).collect();
        assert_eq!(prices, vec![dec!(90), dec!(90), dec!(120), dec!(120)]);
        assert_eq!(quote.totals.grand_total, dec!(420));
        assert_eq!(quote.lines[2].season_rule_id, Some(2));
    }

    #[test]
    fn rounding_happens_once_on_the_total() {
        let mut rule = low_season();
        rule.discount_percent = dec!(33.333);
        let rules = SeasonRuleSet::new(vec![rule]);
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(2, 1), date(2, 4)).unwrap();

        let quote = composer
            .compose(&stay, &[room(dec!(10.01))], None, &ReservationAdjustment::default())
            .unwrap();

        // 10.01 * 0.66667 = 6.6733667 per night; 3 nights = 20.0201001
        assert_eq!(quote.lines[0].unit_price, dec!(6.6733667));
        assert_eq!(quote.totals.grand_total, dec!(20.02));
    }

    #[test]
    fn stale_package_product_is_flagged_not_dropped() {
        let rules = SeasonRuleSet::default();
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(6, 1), date(6, 2)).unwrap();
        let package = expansion(vec![product(1, dec!(30), true), product(2, dec!(20), false)]);

        let quote = composer
            .compose(&stay, &[room(dec!(100))], Some(&package), &ReservationAdjustment::default())
            .unwrap();

        assert_eq!(quote.package_lines.len(), 2);
        let stale = &quote.package_lines[1];
        assert!(stale.flagged);
        assert_eq!(stale.quantity, 0);
        assert_eq!(stale.unit_price, dec!(20));
        assert_eq!(quote.totals.grand_total, dec!(130));
        assert_matches!(
            quote.warnings.as_slice(),
            [QuoteWarning::StaleLinkedProduct { modular_product_id: 2, .. }]
        );
    }

    #[test]
    fn ambiguous_rules_warn_once_per_day_and_audience() {
        let mut a = low_season();
        a.id = 8;
        let mut b = low_season();
        b.id = 4;
        b.discount_percent = dec!(50);
        let rules = SeasonRuleSet::new(vec![a, b]);
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(2, 1), date(2, 3)).unwrap();
        let mut second_room = room(dec!(100));
        second_room.reference = "102".to_string();

        let quote = composer
            .compose(&stay, &[room(dec!(100)), second_room], None, &ReservationAdjustment::default())
            .unwrap();

        assert_eq!(quote.warnings.len(), 2);
        assert!(quote.lines.iter().all(|l| l.season_rule_id == Some(4)));
        assert_eq!(quote.totals.grand_total, dec!(200));
    }

    #[test]
    fn clamped_rule_is_flagged() {
        let mut rule = low_season();
        rule.discount_percent = dec!(140);
        let rules = SeasonRuleSet::new(vec![rule]);
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(2, 1), date(2, 3)).unwrap();

        let quote = composer
            .compose(&stay, &[room(dec!(100))], None, &ReservationAdjustment::default())
            .unwrap();

        assert_eq!(quote.totals.grand_total, dec!(0));
        assert_matches!(
            quote.warnings.as_slice(),
            [QuoteWarning::DiscountClamped { rule_id: 1, .. }]
        );
    }

    #[test]
    fn adjustment_is_applied_after_grand_total() {
        let rules = SeasonRuleSet::new(vec![low_season()]);
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(2, 1), date(2, 3)).unwrap();
        let adjustment = ReservationAdjustment {
            discount: Some(AdjustmentComponent {
                kind: AdjustmentKind::Percentage,
                value: dec!(10),
                reason: Some("repeat guest".to_string()),
            }),
            surcharge: Some(AdjustmentComponent {
                kind: AdjustmentKind::FixedAmount,
                value: dec!(15),
                reason: None,
            }),
        };

        let quote = composer
            .compose(&stay, &[room(dec!(100))], None, &adjustment)
            .unwrap();

        // Season rule still prices the nights; the reservation discount does not touch them.
        assert!(quote.lines.iter().all(|l| l.unit_price == dec!(90)));
        assert_eq!(quote.totals.grand_total, dec!(180));
        assert_eq!(quote.totals.discount_amount, dec!(18));
        assert_eq!(quote.totals.surcharge_amount, dec!(15));
        assert_eq!(quote.totals.final_price, dec!(177));
    }

    #[test]
    fn frozen_snapshot_reproduces_quote_totals() {
        let rules = SeasonRuleSet::new(vec![low_season(), high_season()]);
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(2, 7), date(2, 14)).unwrap();
        let package = expansion(vec![product(1, dec!(30), true), product(2, dec!(20), false)]);
        let adjustment = ReservationAdjustment {
            discount: Some(AdjustmentComponent {
                kind: AdjustmentKind::Percentage,
                value: dec!(12.5),
                reason: None,
            }),
            surcharge: None,
        };

        let quote = composer
            .compose(&stay, &[room(dec!(87.35))], Some(&package), &adjustment)
            .unwrap();
        let snapshot = quote.freeze();

        assert_eq!(snapshot.totals(&adjustment, 2).unwrap(), quote.totals);
        assert_eq!(snapshot.lines.len(), quote.lines.len());
    }

    #[test]
    fn empty_request_and_bad_quantities_are_rejected() {
        let rules = SeasonRuleSet::default();
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(6, 1), date(6, 2)).unwrap();

        assert_matches!(
            composer.compose(&stay, &[], None, &ReservationAdjustment::default()),
            Err(PricingError::InvalidSelection(_))
        );

        let mut zero = room(dec!(100));
        zero.quantity = 0;
        assert_matches!(
            composer.compose(&stay, &[zero], None, &ReservationAdjustment::default()),
            Err(PricingError::InvalidSelection(_))
        );

        let mut huge = room(dec!(100));
        huge.quantity = MAX_QUANTITY + 1;
        assert_matches!(
            composer.compose(&stay, &[huge], None, &ReservationAdjustment::default()),
            Err(PricingError::InvalidSelection(_))
        );
    }

    #[test]
    fn oversized_amounts_fail_instead_of_overflowing() {
        let rules = SeasonRuleSet::default();
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(6, 1), date(6, 2)).unwrap();

        let mut pricey = room(Decimal::from_scientific("5e28").unwrap());
        pricey.quantity = 2;
        assert_matches!(
            composer.compose(&stay, &[pricey], None, &ReservationAdjustment::default()),
            Err(PricingError::AmountOverflow(_))
        );

        let two_rooms = [room(Decimal::MAX), room(Decimal::MAX)];
        assert_matches!(
            composer.compose(&stay, &two_rooms, None, &ReservationAdjustment::default()),
            Err(PricingError::AmountOverflow(_))
        );
    }

    #[test]
    fn stays_longer_than_the_limit_are_rejected() {
        let rules = SeasonRuleSet::default();
        let composer = ReservationComposer::new(
            &rules,
            PricingSettings {
                currency_places: 2,
                max_stay_nights: 30,
            },
        );
        let adjustment = ReservationAdjustment::default();

        let month = StayRange::new(date(6, 1), date(7, 1)).unwrap();
        assert_eq!(composer.compose(&month, &[room(dec!(10))], None, &adjustment).unwrap().nights, 30);

        let longer = StayRange::new(date(6, 1), date(7, 2)).unwrap();
        assert_matches!(
            composer.compose(&longer, &[room(dec!(10))], None, &adjustment),
            Err(PricingError::StayTooLong { nights: 31, max_nights: 30 })
        );

        let centuries = StayRange::new(date(6, 1), NaiveDate::from_ymd_opt(2425, 6, 1).unwrap()).unwrap();
        assert_matches!(
            composer.compose(&centuries, &[room(dec!(10))], None, &adjustment),
            Err(PricingError::StayTooLong { .. })
        );
    }

    #[test]
    fn inactive_package_fails_the_quote() {
        let rules = SeasonRuleSet::default();
        let composer = ReservationComposer::new(&rules, PricingSettings::default());
        let stay = StayRange::new(date(6, 1), date(6, 2)).unwrap();
        let mut package = expansion(vec![product(1, dec!(30), true)]);
        package.package.is_active = false;

        assert_matches!(
            composer.compose(&stay, &[room(dec!(100))], Some(&package), &ReservationAdjustment::default()),
            Err(PricingError::InactivePackage(10))
        );
    }
}
