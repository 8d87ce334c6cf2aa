use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use bytebasket_core::{Entity, FoodbankId, ItemId, Page, PageRequest};
use bytebasket_inventory::{InventoryFilter, InventoryItem, SortColumn, SortOrder, SortSpec};

use super::InventoryStore;
use crate::error::StoreError;

/// In-memory item store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    items: RwLock<HashMap<ItemId, InventoryItem>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_unique_barcode(
        items: &HashMap<ItemId, InventoryItem>,
        candidate: &InventoryItem,
    ) -> Result<(), StoreError> {
        let Some(barcode) = candidate.barcode.as_deref() else {
            return Ok(());
        };
        let taken = items.values().any(|other| {
            other.id != candidate.id
                && other.foodbank_id == candidate.foodbank_id
                && other.barcode.as_deref() == Some(barcode)
        });
        if taken {
            return Err(StoreError::Conflict(
                "an item with this barcode already exists in this foodbank".to_string(),
            ));
        }
        Ok(())
    }

    fn select(
        &self,
        predicate: impl Fn(&InventoryItem) -> bool,
        sort: SortSpec,
    ) -> Result<Vec<InventoryItem>, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::poisoned())?;
        let mut selected: Vec<InventoryItem> =
            items.values().filter(|i| predicate(i)).cloned().collect();
        selected.sort_by(|a, b| sort.compare(a, b));
        Ok(selected)
    }
}

fn in_scope(item: &InventoryItem, foodbank_id: Option<FoodbankId>) -> bool {
    foodbank_id.is_none_or(|id| item.foodbank_id == id)
}

#[async_trait::async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn insert(&self, item: InventoryItem) -> Result<InventoryItem, StoreError> {
        let mut items = self.items.write().map_err(|_| StoreError::poisoned())?;
        if items.contains_key(&item.id) {
            return Err(StoreError::Conflict(format!("item {} already exists", item.id)));
        }
        Self::ensure_unique_barcode(&items, &item)?;
        items.insert(item.id(), item.clone());
        Ok(item)
    }

    async fn get(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::poisoned())?;
        Ok(items.get(&id).cloned())
    }

    async fn update(&self, item: InventoryItem) -> Result<InventoryItem, StoreError> {
        let mut items = self.items.write().map_err(|_| StoreError::poisoned())?;
        if !items.contains_key(&item.id) {
            return Err(StoreError::NotFound);
        }
        Self::ensure_unique_barcode(&items, &item)?;
        items.insert(item.id(), item.clone());
        Ok(item)
    }

    async fn delete(&self, id: ItemId) -> Result<(), StoreError> {
        let mut items = self.items.write().map_err(|_| StoreError::poisoned())?;
        items.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn list(
        &self,
        filter: &InventoryFilter,
        sort: SortSpec,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<InventoryItem>, StoreError> {
        let matching = self.select(|i| filter.matches(i, now), sort)?;
        let total = matching.len() as u64;
        Ok(Page::new(page.slice(&matching), page, total))
    }

    async fn export(
        &self,
        filter: &InventoryFilter,
        sort: SortSpec,
        max_rows: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<InventoryItem>, StoreError> {
        let mut matching = self.select(|i| filter.matches(i, now), sort)?;
        matching.truncate(max_rows as usize);
        Ok(matching)
    }

    async fn low_stock(&self, foodbank_id: Option<FoodbankId>) -> Result<Vec<InventoryItem>, StoreError> {
        self.select(
            |i| i.low_stock && in_scope(i, foodbank_id),
            SortSpec::new(SortColumn::Quantity, SortOrder::Asc),
        )
    }

    async fn expiring(
        &self,
        foodbank_id: Option<FoodbankId>,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<InventoryItem>, StoreError> {
        self.select(
            |i| {
                in_scope(i, foodbank_id)
                    && i.expiration_date.is_some_and(|d| now <= d && d <= until)
            },
            SortSpec::new(SortColumn::ExpirationDate, SortOrder::Asc),
        )
    }

    async fn categories(&self, foodbank_id: Option<FoodbankId>) -> Result<Vec<String>, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::poisoned())?;
        let categories: BTreeSet<String> = items
            .values()
            .filter(|i| in_scope(i, foodbank_id))
            .map(|i| i.category.clone())
            .collect();
        Ok(categories.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytebasket_core::UserId;
    use bytebasket_inventory::NewInventoryItem;
    use chrono::Duration;

    fn item(foodbank_id: FoodbankId, name: &str, quantity: i64, barcode: Option<&str>) -> InventoryItem {
        InventoryItem::create(
            NewInventoryItem {
                foodbank_id,
                item_name: name.to_string(),
                category: "Grains".to_string(),
                quantity,
                expiration_date: None,
                storage_location: None,
                dietary_category: None,
                barcode: barcode.map(str::to_string),
                minimum_stock_level: None,
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn barcode_is_unique_per_foodbank() {
        let store = InMemoryInventoryStore::new();
        let fb_a = FoodbankId::new();
        let fb_b = FoodbankId::new();

        store.insert(item(fb_a, "Rice", 5, Some("123"))).await.unwrap();
        let dup = store.insert(item(fb_a, "Oats", 5, Some("123"))).await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        store.insert(item(fb_b, "Oats", 5, Some("123"))).await.unwrap();
        store.insert(item(fb_a, "Beans", 5, None)).await.unwrap();
        store.insert(item(fb_a, "Lentils", 5, None)).await.unwrap();
    }

    #[tokio::test]
    async fn update_and_delete_require_existing_item() {
        let store = InMemoryInventoryStore::new();
        let ghost = item(FoodbankId::new(), "Ghost", 1, None);

        assert_eq!(store.update(ghost.clone()).await, Err(StoreError::NotFound));
        assert_eq!(store.delete(ghost.id).await, Err(StoreError::NotFound));

        store.insert(ghost.clone()).await.unwrap();
        store.delete(ghost.id).await.unwrap();
        assert_eq!(store.get(ghost.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_paginates_filtered_results() {
        let store = InMemoryInventoryStore::new();
        let fb = FoodbankId::new();
        for n in 0..25 {
            store.insert(item(fb, &format!("Item {n:02}"), n, None)).await.unwrap();
        }
        store.insert(item(FoodbankId::new(), "Elsewhere", 1, None)).await.unwrap();

        let filter = InventoryFilter {
            foodbank_id: Some(fb),
            ..Default::default()
        };
        let sort = SortSpec::new(SortColumn::Quantity, SortOrder::Asc);
        let page = store
            .list(&filter, sort, PageRequest::new(3, 10), Utc::now())
            .await
            .unwrap();

        assert_eq!(page.pagination.total_items, 25);
        assert_eq!(page.pagination.total_pages, 3);
        let quantities: Vec<i64> = page.items.iter().map(|i| i.quantity).collect();
        assert_eq!(quantities, vec![20, 21, 22, 23, 24]);
    }

    #[tokio::test]
    async fn alerts_are_scoped_and_ordered() {
        let store = InMemoryInventoryStore::new();
        let fb = FoodbankId::new();
        let now = Utc::now();

        store.insert(item(fb, "Milk", 7, None)).await.unwrap();
        store.insert(item(fb, "Eggs", 2, None)).await.unwrap();
        store.insert(item(fb, "Flour", 90, None)).await.unwrap();
        store.insert(item(FoodbankId::new(), "Other", 1, None)).await.unwrap();

        let low = store.low_stock(Some(fb)).await.unwrap();
        let names: Vec<&str> = low.iter().map(|i| i.item_name.as_str()).collect();
        assert_eq!(names, vec!["Eggs", "Milk"]);

        let mut later = item(fb, "Bread", 50, None);
        later.expiration_date = Some(now + Duration::days(5));
        let mut sooner = item(fb, "Yogurt", 50, None);
        sooner.expiration_date = Some(now + Duration::days(1));
        let mut past = item(fb, "Old", 50, None);
        past.expiration_date = Some(now - Duration::days(1));
        for i in [later, sooner, past] {
            store.insert(i).await.unwrap();
        }

        let expiring = store
            .expiring(Some(fb), now, now + Duration::days(7))
            .await
            .unwrap();
        let names: Vec<&str> = expiring.iter().map(|i| i.item_name.as_str()).collect();
        assert_eq!(names, vec!["Yogurt", "Bread"]);
    }

    #[tokio::test]
    async fn export_respects_row_cap() {
        let store = InMemoryInventoryStore::new();
        let fb = FoodbankId::new();
        for n in 0..5 {
            store.insert(item(fb, &format!("Item {n}"), n, None)).await.unwrap();
        }
        let rows = store
            .export(&InventoryFilter::default(), SortSpec::default(), 3, Utc::now())
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn categories_are_distinct_and_sorted() {
        let store = InMemoryInventoryStore::new();
        let fb = FoodbankId::new();
        let mut canned = item(fb, "Beans", 3, None);
        canned.category = "Canned".to_string();
        store.insert(canned).await.unwrap();
        store.insert(item(fb, "Rice", 3, None)).await.unwrap();
        store.insert(item(fb, "Oats", 3, None)).await.unwrap();

        assert_eq!(
            store.categories(Some(fb)).await.unwrap(),
            vec!["Canned".to_string(), "Grains".to_string()]
        );
        assert!(store.categories(Some(FoodbankId::new())).await.unwrap().is_empty());
    }
}
