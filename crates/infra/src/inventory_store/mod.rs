//! Item Store boundary.
//!
//! Every backend receives already-validated [`InventoryItem`]s (flags
//! evaluated by the domain layer) and a parsed query; backends only filter,
//! sort, paginate and enforce uniqueness.

pub mod in_memory;
pub mod postgres;

use chrono::{DateTime, Utc};

use bytebasket_core::{FoodbankId, ItemId, Page, PageRequest};
use bytebasket_inventory::{InventoryFilter, InventoryItem, SortSpec};

use crate::error::StoreError;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;

#[async_trait::async_trait]
pub trait InventoryStore: Send + Sync {
    /// Insert a new item. Duplicate barcodes within a food bank conflict.
    async fn insert(&self, item: InventoryItem) -> Result<InventoryItem, StoreError>;

    async fn get(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError>;

    /// Replace an existing item. `NotFound` if it does not exist.
    async fn update(&self, item: InventoryItem) -> Result<InventoryItem, StoreError>;

    /// `NotFound` if it does not exist.
    async fn delete(&self, id: ItemId) -> Result<(), StoreError>;

    /// Filtered, sorted page plus total count.
    async fn list(
        &self,
        filter: &InventoryFilter,
        sort: SortSpec,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<InventoryItem>, StoreError>;

    /// Filtered and sorted, unpaginated, at most `max_rows` items.
    async fn export(
        &self,
        filter: &InventoryFilter,
        sort: SortSpec,
        max_rows: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<InventoryItem>, StoreError>;

    /// Items at or below their threshold, quantity ascending.
    async fn low_stock(&self, foodbank_id: Option<FoodbankId>) -> Result<Vec<InventoryItem>, StoreError>;

    /// Items expiring in `[now, until]`, soonest first.
    async fn expiring(
        &self,
        foodbank_id: Option<FoodbankId>,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<InventoryItem>, StoreError>;

    /// Distinct categories in use.
    async fn categories(&self, foodbank_id: Option<FoodbankId>) -> Result<Vec<String>, StoreError>;
}
