//! Season rule snapshot and per-day resolution.
//!
//! Rules are kept in an arena sorted by start date so a lookup can stop as
//! soon as it reaches rules that start after the requested day. The expected
//! rule count is small and administrator-curated, so a linear scan is enough.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::pricing::calculators::MAX_DISCOUNT_PERCENT;
use crate::pricing::error::PricingError;
use crate::pricing::models::{Audience, DbId, NewSeasonRule, SeasonRule};

/// Immutable snapshot of every season rule, active or not.
#[derive(Debug, Clone, Default)]
pub struct SeasonRuleSet {
    rules: Vec<SeasonRule>,
}

/// Outcome of resolving one day.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    pub rule: Option<&'a SeasonRule>,
    /// Ids of other candidates that tied the winner on priority and span.
    /// Non-empty means the lowest-id tie-break decided.
    pub tied_with: Vec<DbId>,
}

impl Resolution<'_> {
    pub fn is_ambiguous(&self) -> bool {
        !self.tied_with.is_empty()
    }
}

/// Winner ordering: highest priority, then narrowest span, then lowest id.
fn precedence(a: &SeasonRule, b: &SeasonRule) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.span_days().cmp(&b.span_days()))
        .then_with(|| a.id.cmp(&b.id))
}

impl SeasonRuleSet {
    pub fn new(mut rules: Vec<SeasonRule>) -> Self {
        rules.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Self { rules }
    }

    pub fn rules(&self) -> &[SeasonRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: DbId) -> Option<&SeasonRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    fn candidates(&self, date: NaiveDate) -> impl Iterator<Item = &SeasonRule> {
        self.rules
            .iter()
            .take_while(move |r| r.start_date <= date)
            .filter(move |r| r.is_active && r.covers(date))
    }

    fn pick<'a>(mut candidates: Vec<&'a SeasonRule>) -> Resolution<'a> {
        candidates.sort_by(|a, b| precedence(a, b));
        let Some((winner, rest)) = candidates.split_first() else {
            return Resolution {
                rule: None,
                tied_with: Vec::new(),
            };
        };

        let tied_with = rest
            .iter()
            .filter(|r| r.priority == winner.priority && r.span_days() == winner.span_days())
            .map(|r| r.id)
            .collect();

        Resolution {
            rule: Some(*winner),
            tied_with,
        }
    }

    /// Resolve the single rule that prices `audience` on `date`.
    pub fn resolve(&self, date: NaiveDate, audience: Audience) -> Resolution<'_> {
        Self::pick(
            self.candidates(date)
                .filter(|r| r.applies_to(audience))
                .collect(),
        )
    }

    /// Resolve the winning rule for `date` across both audiences.
    pub fn resolve_any(&self, date: NaiveDate) -> Resolution<'_> {
        Self::pick(
            self.candidates(date)
                .filter(|r| r.applies_to_rooms || r.applies_to_programs)
                .collect(),
        )
    }

    /// Active rules whose range intersects `[start, end]`, optionally
    /// ignoring one rule (the one being edited).
    pub fn overlapping(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<DbId>,
    ) -> Vec<&SeasonRule> {
        self.rules
            .iter()
            .take_while(|r| r.start_date <= end)
            .filter(|r| r.is_active && r.overlaps(start, end) && Some(r.id) != exclude_id)
            .collect()
    }
}

/// Validate an administrative season rule before it reaches the store.
pub fn validate_season_rule(rule: &NewSeasonRule) -> Result<(), PricingError> {
    if rule.name.trim().is_empty() {
        return Err(PricingError::InvalidSeasonRule("name is required".to_string()));
    }
    if rule.start_date > rule.end_date {
        return Err(PricingError::InvalidSeasonRule(format!(
            "start date {} is after end date {}",
            rule.start_date, rule.end_date
        )));
    }
    if rule.discount_percent.abs() > MAX_DISCOUNT_PERCENT {
        return Err(PricingError::InvalidSeasonRule(format!(
            "discount percent {} outside [-100, 100]",
            rule.discount_percent
        )));
    }
    if !rule.applies_to_rooms && !rule.applies_to_programs {
        return Err(PricingError::InvalidSeasonRule(
            "rule must apply to rooms, programs or both".to_string(),
        ));
    }
    Ok(())
}
