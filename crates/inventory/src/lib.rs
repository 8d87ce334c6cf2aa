//! Inventory domain module.
//!
//! Business rules for food bank stock: the item record and its write paths,
//! the stock evaluator (low stock / expiring soon) and the query model used
//! by every store backend. No IO, no HTTP, no storage.

pub mod item;
pub mod query;
pub mod stock;

pub use item::{
    DietaryCategory, InventoryItem, InventoryItemPatch, NewInventoryItem, QuantityChange,
    QuantityOperation,
};
pub use query::{
    InventoryFilter, InventoryQuery, InventoryQueryParams, SortColumn, SortOrder, SortSpec,
};
pub use stock::{StockStatus, DEFAULT_MINIMUM_STOCK_LEVEL, EXPIRING_SOON_DAYS};
