//! Account storage (single canonical user schema).

pub mod in_memory;
pub mod postgres;

use bytebasket_auth::User;
use bytebasket_core::UserId;

use crate::error::StoreError;

pub use in_memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Emails are unique.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// `NotFound` if it does not exist.
    async fn update(&self, user: User) -> Result<User, StoreError>;
}
