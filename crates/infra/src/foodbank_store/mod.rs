//! Food bank directory storage.

pub mod in_memory;
pub mod postgres;

use bytebasket_core::{FoodbankId, Page, PageRequest};
use bytebasket_foodbanks::Foodbank;

use crate::error::StoreError;

pub use in_memory::InMemoryFoodbankStore;
pub use postgres::PostgresFoodbankStore;

#[async_trait::async_trait]
pub trait FoodbankStore: Send + Sync {
    /// Names are unique case-insensitively.
    async fn insert(&self, foodbank: Foodbank) -> Result<Foodbank, StoreError>;

    async fn get(&self, id: FoodbankId) -> Result<Option<Foodbank>, StoreError>;

    /// Name-ordered page, optionally narrowed by a name/address search.
    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Foodbank>, StoreError>;
}
