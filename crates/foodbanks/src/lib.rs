//! Food bank directory module.
//!
//! Food banks are the ownership boundary for inventory: every item belongs to
//! exactly one, and staff accounts are bound to one.

pub mod foodbank;

pub use foodbank::{Foodbank, NewFoodbank};
