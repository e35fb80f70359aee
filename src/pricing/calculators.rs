//! Core pricing calculation functions.
//!
//! Pure functions for pricing math - no store access.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::pricing::error::PricingError;
use crate::pricing::models::{AdjustmentComponent, AdjustmentKind, ReservationAdjustment, SeasonRule};

/// Largest magnitude a season rule may discount or surcharge, in percent.
pub const MAX_DISCOUNT_PERCENT: Decimal = Decimal::ONE_HUNDRED;

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities. This reduces cumulative rounding bias.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use posada_pricing::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// `amount * factor`, or `AmountOverflow` naming what was being computed.
pub fn checked_mul(amount: Decimal, factor: Decimal, what: &str) -> Result<Decimal, PricingError> {
    amount
        .checked_mul(factor)
        .ok_or_else(|| PricingError::AmountOverflow(what.to_string()))
}

/// Sum amounts, failing with `AmountOverflow` instead of panicking.
pub fn checked_sum(
    amounts: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> Result<Decimal, PricingError> {
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount)
            .ok_or_else(|| PricingError::AmountOverflow(what.to_string()))
    })
}

/// Unit price times quantity.
pub fn line_total(unit_price: Decimal, quantity: u32) -> Result<Decimal, PricingError> {
    checked_mul(unit_price, Decimal::from(quantity), "line total")
}

/// Clamp a rule's percentage into `[-100, 100]`.
///
/// Returns the clamped value and whether clamping happened.
pub fn clamp_discount_percent(percent: Decimal) -> (Decimal, bool) {
    if percent > MAX_DISCOUNT_PERCENT {
        (MAX_DISCOUNT_PERCENT, true)
    } else if percent < -MAX_DISCOUNT_PERCENT {
        (-MAX_DISCOUNT_PERCENT, true)
    } else {
        (percent, false)
    }
}

/// Adjusted nightly price for one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyPrice {
    pub base_price: Decimal,
    pub final_price: Decimal,
    /// The rule's percentage was outside `[-100, 100]` and was clamped.
    pub clamped: bool,
}

/// Apply a resolved season rule to a base nightly price.
///
/// `final = base * (1 - discount_percent / 100)`. The result is left
/// unrounded; rounding happens once on the aggregated total.
pub fn daily_price(base_price: Decimal, rule: Option<&SeasonRule>) -> Result<DailyPrice, PricingError> {
    let Some(rule) = rule else {
        return Ok(DailyPrice {
            base_price,
            final_price: base_price,
            clamped: false,
        });
    };

    let (percent, clamped) = clamp_discount_percent(rule.discount_percent);
    let factor = Decimal::ONE - percent / Decimal::ONE_HUNDRED;

    Ok(DailyPrice {
        base_price,
        final_price: checked_mul(base_price, factor, "seasonal price")?,
        clamped,
    })
}

/// Nights of a stay: every date in `[start, end)`.
pub fn nights(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d < end)
}

/// Result of applying a reservation-level adjustment to a grand total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentBreakdown {
    pub discount_amount: Decimal,
    pub surcharge_amount: Decimal,
    pub final_price: Decimal,
}

/// Reject adjustment components that cannot be applied.
pub fn validate_adjustment(adjustment: &ReservationAdjustment) -> Result<(), PricingError> {
    for (label, component) in [
        ("discount", adjustment.discount.as_ref()),
        ("surcharge", adjustment.surcharge.as_ref()),
    ] {
        let Some(component) = component else { continue };
        if component.value < Decimal::ZERO {
            return Err(PricingError::InvalidAdjustment(format!(
                "{} value must not be negative",
                label
            )));
        }
        if label == "discount"
            && component.kind == AdjustmentKind::Percentage
            && component.value > Decimal::ONE_HUNDRED
        {
            return Err(PricingError::InvalidAdjustment(
                "discount percentage must not exceed 100".to_string(),
            ));
        }
    }
    Ok(())
}

fn component_amount(
    grand_total: Decimal,
    component: &AdjustmentComponent,
    places: u32,
) -> Result<Decimal, PricingError> {
    let amount = match component.kind {
        AdjustmentKind::Percentage => {
            checked_mul(grand_total, component.value / Decimal::ONE_HUNDRED, "adjustment")?
        }
        AdjustmentKind::FixedAmount => component.value,
    };
    Ok(round_money(amount, places))
}

/// Apply the reservation-level discount and surcharge to a rounded grand total.
///
/// Both percentages use the grand total as their base. A fixed discount is
/// capped at the grand total and the final price never drops below zero.
pub fn apply_adjustment(
    grand_total: Decimal,
    adjustment: &ReservationAdjustment,
    places: u32,
) -> Result<AdjustmentBreakdown, PricingError> {
    validate_adjustment(adjustment)?;

    let discount_amount = match &adjustment.discount {
        Some(discount) => component_amount(grand_total, discount, places)?.min(grand_total),
        None => Decimal::ZERO,
    };

    let surcharge_amount = match &adjustment.surcharge {
        Some(surcharge) => component_amount(grand_total, surcharge, places)?,
        None => Decimal::ZERO,
    };

    let final_price = checked_sum([grand_total - discount_amount, surcharge_amount], "final price")?
        .max(Decimal::ZERO);

    Ok(AdjustmentBreakdown {
        discount_amount,
        surcharge_amount,
        final_price,
    })
}
