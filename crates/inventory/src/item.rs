use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bytebasket_core::error::{optional_text, required_text};
use bytebasket_core::{DomainError, DomainResult, Entity, FoodbankId, ItemId, UserId};

use crate::stock::{StockStatus, DEFAULT_MINIMUM_STOCK_LEVEL};

/// Dietary classification of an item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietaryCategory {
    Vegetarian,
    Vegan,
    GlutenFree,
    DairyFree,
    NutFree,
    Halal,
    Kosher,
    LowSodium,
    SugarFree,
}

impl DietaryCategory {
    pub const ALL: [DietaryCategory; 9] = [
        DietaryCategory::Vegetarian,
        DietaryCategory::Vegan,
        DietaryCategory::GlutenFree,
        DietaryCategory::DairyFree,
        DietaryCategory::NutFree,
        DietaryCategory::Halal,
        DietaryCategory::Kosher,
        DietaryCategory::LowSodium,
        DietaryCategory::SugarFree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DietaryCategory::Vegetarian => "vegetarian",
            DietaryCategory::Vegan => "vegan",
            DietaryCategory::GlutenFree => "gluten-free",
            DietaryCategory::DairyFree => "dairy-free",
            DietaryCategory::NutFree => "nut-free",
            DietaryCategory::Halal => "halal",
            DietaryCategory::Kosher => "kosher",
            DietaryCategory::LowSodium => "low-sodium",
            DietaryCategory::SugarFree => "sugar-free",
        }
    }
}

impl core::fmt::Display for DietaryCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DietaryCategory {
    type Err = DomainError;

    /// Case-insensitive; `_` is accepted in place of `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        DietaryCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown dietary_category '{}'", s.trim())))
    }
}

/// Input for creating an item. Dates and enums are already parsed.
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub foodbank_id: FoodbankId,
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    pub expiration_date: Option<DateTime<Utc>>,
    pub storage_location: Option<String>,
    pub dietary_category: Option<DietaryCategory>,
    pub barcode: Option<String>,
    pub minimum_stock_level: Option<i64>,
}

/// Partial update. For clearable fields the outer `Option` means "present in
/// the request" and the inner one carries the new value (`None` clears it).
#[derive(Debug, Clone, Default)]
pub struct InventoryItemPatch {
    pub foodbank_id: Option<FoodbankId>,
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i64>,
    pub expiration_date: Option<Option<DateTime<Utc>>>,
    pub storage_location: Option<Option<String>>,
    pub dietary_category: Option<Option<DietaryCategory>>,
    pub barcode: Option<Option<String>>,
    pub minimum_stock_level: Option<i64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityOperation {
    #[default]
    Set,
    Add,
    Subtract,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityChange {
    pub quantity: i64,
    #[serde(default)]
    pub operation: QuantityOperation,
}

impl QuantityChange {
    /// Resulting stock level when applied to `current`.
    pub fn apply_to(&self, current: i64) -> DomainResult<i64> {
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity must be a non-negative integer"));
        }
        let next = match self.operation {
            QuantityOperation::Set => Some(self.quantity),
            QuantityOperation::Add => current.checked_add(self.quantity),
            QuantityOperation::Subtract => current.checked_sub(self.quantity),
        }
        .ok_or_else(|| DomainError::validation("quantity out of range"))?;

        if next < 0 {
            return Err(DomainError::validation(format!(
                "insufficient stock: cannot subtract {} from {current}",
                self.quantity
            )));
        }
        Ok(next)
    }
}

/// A stocked item held by one food bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub foodbank_id: FoodbankId,
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    pub expiration_date: Option<DateTime<Utc>>,
    pub storage_location: Option<String>,
    pub dietary_category: Option<DietaryCategory>,
    pub barcode: Option<String>,
    pub minimum_stock_level: i64,
    /// Derived: `quantity <= minimum_stock_level`, recomputed on every write.
    pub low_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
}

impl InventoryItem {
    pub fn create(new: NewInventoryItem, actor: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        let item_name = required_text("item_name", &new.item_name)?;
        let category = required_text("category", &new.category)?;
        ensure_non_negative("quantity", new.quantity)?;
        let minimum_stock_level = new.minimum_stock_level.unwrap_or(DEFAULT_MINIMUM_STOCK_LEVEL);
        ensure_non_negative("minimum_stock_level", minimum_stock_level)?;

        let mut item = Self {
            id: ItemId::new(),
            foodbank_id: new.foodbank_id,
            item_name,
            category,
            quantity: new.quantity,
            expiration_date: new.expiration_date,
            storage_location: optional_text(new.storage_location.as_deref()),
            dietary_category: new.dietary_category,
            barcode: optional_text(new.barcode.as_deref()),
            minimum_stock_level,
            low_stock: false,
            created_at: now,
            updated_at: now,
            created_by: Some(actor),
            updated_by: Some(actor),
        };
        item.refresh_low_stock(now);
        Ok(item)
    }

    /// Apply a partial update. Either every field is applied or none is.
    pub fn apply_patch(
        &mut self,
        patch: InventoryItemPatch,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut next = self.clone();

        if let Some(foodbank_id) = patch.foodbank_id {
            next.foodbank_id = foodbank_id;
        }
        if let Some(name) = patch.item_name {
            next.item_name = required_text("item_name", &name)?;
        }
        if let Some(category) = patch.category {
            next.category = required_text("category", &category)?;
        }
        if let Some(quantity) = patch.quantity {
            ensure_non_negative("quantity", quantity)?;
            next.quantity = quantity;
        }
        if let Some(minimum) = patch.minimum_stock_level {
            ensure_non_negative("minimum_stock_level", minimum)?;
            next.minimum_stock_level = minimum;
        }
        if let Some(expiration) = patch.expiration_date {
            next.expiration_date = expiration;
        }
        if let Some(location) = patch.storage_location {
            next.storage_location = optional_text(location.as_deref());
        }
        if let Some(dietary) = patch.dietary_category {
            next.dietary_category = dietary;
        }
        if let Some(barcode) = patch.barcode {
            next.barcode = optional_text(barcode.as_deref());
        }

        next.updated_by = Some(actor);
        next.refresh_low_stock(now);
        *self = next;
        Ok(())
    }

    /// Set, add to or subtract from the stock level. The item is left
    /// untouched when the result would be negative.
    pub fn change_quantity(
        &mut self,
        change: QuantityChange,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.quantity = change.apply_to(self.quantity)?;
        self.updated_by = Some(actor);
        self.refresh_low_stock(now);
        Ok(())
    }

    /// Read-time evaluation of both flags.
    pub fn status(&self, now: DateTime<Utc>) -> StockStatus {
        StockStatus::evaluate(
            self.quantity,
            self.minimum_stock_level,
            self.expiration_date,
            now,
        )
    }

    fn refresh_low_stock(&mut self, now: DateTime<Utc>) {
        self.low_stock = self.status(now).low_stock;
        self.updated_at = now;
    }
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

fn ensure_non_negative(field: &str, value: i64) -> DomainResult<()> {
    if value < 0 {
        return Err(DomainError::validation(format!(
            "{field} must be a non-negative integer"
        )));
    }
    Ok(())
}
