use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use bytebasket_auth::{Role, User};
use bytebasket_core::FoodbankId;
use bytebasket_inventory::{DietaryCategory, InventoryItem, InventoryItemPatch};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: Role,
    pub foodbank_id: Option<FoodbankId>,
}

#[derive(Debug, Deserialize)]
pub struct FoodbankListQuery {
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub foodbank_id: Option<FoodbankId>,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub category: String,
    pub quantity: Option<i64>,
    pub expiration_date: Option<String>,
    pub storage_location: Option<String>,
    pub dietary_category: Option<String>,
    pub barcode: Option<String>,
    pub minimum_stock_level: Option<i64>,
}

/// Partial update: absent fields are left alone, `null` clears optional ones.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub foodbank_id: Option<FoodbankId>,
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub expiration_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub storage_location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub dietary_category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub barcode: Option<Option<String>>,
    pub minimum_stock_level: Option<i64>,
}

impl UpdateItemRequest {
    pub fn into_patch(self) -> Result<InventoryItemPatch, ApiError> {
        Ok(InventoryItemPatch {
            foodbank_id: self.foodbank_id,
            item_name: self.item_name,
            category: self.category,
            quantity: self.quantity,
            expiration_date: self
                .expiration_date
                .map(|d| parse_optional_date(d.as_deref()))
                .transpose()?,
            storage_location: self.storage_location,
            dietary_category: self
                .dietary_category
                .map(|d| parse_optional_dietary_category(d.as_deref()))
                .transpose()?,
            barcode: self.barcode,
            minimum_stock_level: self.minimum_stock_level,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<String>,
    pub foodbank_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub foodbank_id: Option<String>,
}

/// Distinguishes a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// Parsing helpers
// -------------------------

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date taken as midnight UTC.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| ApiError::validation(format!("invalid expiration_date '{raw}'")))
}

fn parse_dietary_category(raw: &str) -> Result<DietaryCategory, ApiError> {
    raw.parse::<DietaryCategory>().map_err(ApiError::from)
}

/// Blank counts as absent.
pub fn parse_optional_dietary_category(raw: Option<&str>) -> Result<Option<DietaryCategory>, ApiError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(parse_dietary_category)
        .transpose()
}

/// Optional, blank-tolerant date field.
pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    raw.filter(|s| !s.trim().is_empty()).map(parse_date).transpose()
}

// -------------------------
// Response DTOs
// -------------------------

/// Item JSON: the stored record plus read-time flags.
#[derive(Debug, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub is_expiring_soon: bool,
}

impl ItemView {
    pub fn new(mut item: InventoryItem, now: DateTime<Utc>) -> Self {
        let status = item.status(now);
        item.low_stock = status.low_stock;
        Self {
            item,
            is_expiring_soon: status.is_expiring_soon,
        }
    }

    pub fn many(items: Vec<InventoryItem>, now: DateTime<Utc>) -> Vec<Self> {
        items.into_iter().map(|item| Self::new(item, now)).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}
