//! Seasonal pricing and modular reservation engine.
//!
//! Resolves the season rule for every night of a stay, mirrors catalog items
//! into modular products, expands packages and composes reservation quotes
//! whose frozen snapshot is persisted through a `PricingStore`.

pub mod calculators;
pub mod catalog;
pub mod composer;
pub mod error;
pub mod models;
pub mod packages;
pub mod requests;
pub mod reservations;
pub mod responses;
pub mod routes;
pub mod seasons;
pub mod services;

// Re-export commonly used items
pub use calculators::round_money;
pub use composer::{PricingSettings, ReservationComposer, ReservationQuote, StayRange};
pub use error::PricingError;
pub use routes::router;
pub use seasons::SeasonRuleSet;
