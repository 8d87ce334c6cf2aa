//! Canonical user account record.
//!
//! One schema for every role: identity, credentials, role and the optional
//! food bank association that drives scoping.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use bytebasket_core::error::required_text;
use bytebasket_core::{DomainError, DomainResult, Entity, FoodbankId, UserId};

use crate::{Principal, Role};

/// Input for creating an account (password already hashed).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub foodbank_id: Option<FoodbankId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    /// Lower-cased, unique.
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub foodbank_id: Option<FoodbankId>,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new, unverified account with a fresh verification token.
    pub fn register(new: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        let email = normalize_email(&new.email)?;
        let name = required_text("name", &new.name)?;

        Ok(Self {
            id: UserId::new(),
            email,
            name,
            password_hash: new.password_hash,
            role: new.role,
            foodbank_id: new.foodbank_id,
            email_verified: false,
            verification_token: Some(Uuid::new_v4().simple().to_string()),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.email.clone(), self.role, self.foodbank_id)
    }

    pub fn mark_verified(&mut self, now: DateTime<Utc>) {
        self.email_verified = true;
        self.verification_token = None;
        self.updated_at = now;
    }

    /// Change role and food bank association.
    ///
    /// Staff accounts must belong to a food bank.
    pub fn assign_role(
        &mut self,
        role: Role,
        foodbank_id: Option<FoodbankId>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if role == Role::Staff && foodbank_id.is_none() {
            return Err(DomainError::validation("staff accounts require a foodbank_id"));
        }
        self.role = role;
        self.foodbank_id = foodbank_id;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Trim and lower-case an email address, with a basic shape check.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("a valid email is required"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Pat".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::Donor,
            foodbank_id: None,
        }
    }

    #[test]
    fn register_normalizes_and_issues_token() {
        let user = User::register(new_user("  Pat@Example.ORG "), Utc::now()).unwrap();
        assert_eq!(user.email, "pat@example.org");
        assert!(!user.email_verified);
        assert!(user.verification_token.is_some());
    }

    #[test]
    fn register_rejects_bad_email() {
        for bad in ["", "pat", "pat@", "@example.org", "pat@localhost"] {
            assert!(User::register(new_user(bad), Utc::now()).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn verification_clears_token() {
        let mut user = User::register(new_user("pat@example.org"), Utc::now()).unwrap();
        user.mark_verified(Utc::now());
        assert!(user.email_verified);
        assert!(user.verification_token.is_none());
    }

    #[test]
    fn staff_requires_foodbank() {
        let mut user = User::register(new_user("pat@example.org"), Utc::now()).unwrap();
        assert!(user.assign_role(Role::Staff, None, Utc::now()).is_err());

        let fb = FoodbankId::new();
        user.assign_role(Role::Staff, Some(fb), Utc::now()).unwrap();
        assert_eq!(user.principal().foodbank_id, Some(fb));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let user = User::register(new_user("pat@example.org"), Utc::now()).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("verification_token").is_none());
    }
}
