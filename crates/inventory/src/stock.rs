//! Stock evaluator.
//!
//! Pure functions deriving the `low_stock` and `is_expiring_soon` flags. The
//! write paths in [`crate::item`] and the read-time projection both go through
//! [`StockStatus::evaluate`], so the two can never disagree.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const DEFAULT_MINIMUM_STOCK_LEVEL: i64 = 10;

/// Window (in days) for the "expiring soon" flag.
pub const EXPIRING_SOON_DAYS: i64 = 7;

pub fn is_low_stock(quantity: i64, minimum_stock_level: i64) -> bool {
    quantity <= minimum_stock_level
}

/// `now <= expiration <= now + days`. Absent dates never expire.
pub fn expires_within(expiration: Option<DateTime<Utc>>, now: DateTime<Utc>, days: i64) -> bool {
    match expiration {
        Some(date) => now <= date && date <= now + Duration::days(days),
        None => false,
    }
}

pub fn is_expiring_soon(expiration: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_within(expiration, now, EXPIRING_SOON_DAYS)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct StockStatus {
    pub low_stock: bool,
    pub is_expiring_soon: bool,
}

impl StockStatus {
    pub fn evaluate(
        quantity: i64,
        minimum_stock_level: i64,
        expiration: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            low_stock: is_low_stock(quantity, minimum_stock_level),
            is_expiring_soon: is_expiring_soon(expiration, now),
        }
    }
}
