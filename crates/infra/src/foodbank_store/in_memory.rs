use std::collections::HashMap;
use std::sync::RwLock;

use bytebasket_core::{Entity, FoodbankId, Page, PageRequest};
use bytebasket_foodbanks::Foodbank;

use super::FoodbankStore;
use crate::error::StoreError;

/// In-memory food bank directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryFoodbankStore {
    foodbanks: RwLock<HashMap<FoodbankId, Foodbank>>,
}

impl InMemoryFoodbankStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FoodbankStore for InMemoryFoodbankStore {
    async fn insert(&self, foodbank: Foodbank) -> Result<Foodbank, StoreError> {
        let mut foodbanks = self.foodbanks.write().map_err(|_| StoreError::poisoned())?;
        let name = foodbank.name.to_lowercase();
        if foodbanks.values().any(|f| f.name.to_lowercase() == name) {
            return Err(StoreError::Conflict(
                "a foodbank with this name already exists".to_string(),
            ));
        }
        foodbanks.insert(foodbank.id(), foodbank.clone());
        Ok(foodbank)
    }

    async fn get(&self, id: FoodbankId) -> Result<Option<Foodbank>, StoreError> {
        let foodbanks = self.foodbanks.read().map_err(|_| StoreError::poisoned())?;
        Ok(foodbanks.get(&id).cloned())
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Foodbank>, StoreError> {
        let foodbanks = self.foodbanks.read().map_err(|_| StoreError::poisoned())?;
        let mut matching: Vec<Foodbank> = foodbanks
            .values()
            .filter(|f| search.is_none_or(|s| f.matches_search(s)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        let total = matching.len() as u64;
        Ok(Page::new(page.slice(&matching), page, total))
    }
}
