use std::collections::HashMap;
use std::sync::RwLock;

use bytebasket_auth::User;
use bytebasket_core::{Entity, UserId};

use super::UserStore;
use crate::error::StoreError;

/// In-memory account store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, predicate: impl Fn(&User) -> bool) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::poisoned())?;
        Ok(users.values().find(|u| predicate(u)).cloned())
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::poisoned())?;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(
                "an account with this email already exists".to_string(),
            ));
        }
        users.insert(user.id(), user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find(|u| u.email == email)
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        self.find(|u| u.verification_token.as_deref() == Some(token))
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::poisoned())?;
        match users.get_mut(&user.id()) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytebasket_auth::{NewUser, Role};
    use chrono::Utc;

    fn user(email: &str) -> User {
        User::register(
            NewUser {
                email: email.to_string(),
                name: "Sam".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                role: Role::Donor,
                foodbank_id: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = InMemoryUserStore::new();
        store.insert(user("sam@example.org")).await.unwrap();
        let dup = store.insert(user("SAM@example.org")).await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn lookup_by_email_and_token() {
        let store = InMemoryUserStore::new();
        let sam = store.insert(user("sam@example.org")).await.unwrap();
        let token = sam.verification_token.clone().unwrap();

        let found = store.find_by_email("sam@example.org").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(sam.id));

        let found = store.find_by_verification_token(&token).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(sam.id));
        assert!(store.find_by_verification_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_requires_existing_user() {
        let store = InMemoryUserStore::new();
        let ghost = user("ghost@example.org");
        assert_eq!(store.update(ghost).await.map(|u| u.id), Err(StoreError::NotFound));
    }
}
