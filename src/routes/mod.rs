//! Non-pricing HTTP routes: liveness and the reservation lifecycle.

pub mod health;
pub mod reservations;
