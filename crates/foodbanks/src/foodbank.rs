use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bytebasket_core::error::{optional_text, required_text};
use bytebasket_core::{DomainError, DomainResult, Entity, FoodbankId};

/// Input for registering a food bank.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFoodbank {
    pub name: String,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Foodbank {
    pub id: FoodbankId,
    pub name: String,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Foodbank {
    pub fn create(new: NewFoodbank, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = required_text("name", &new.name)?;
        let contact_email = optional_text(new.contact_email.as_deref());
        if let Some(email) = &contact_email {
            if !email.contains('@') {
                return Err(DomainError::validation("contact_email must be an email address"));
            }
        }

        Ok(Self {
            id: FoodbankId::new(),
            name,
            address: optional_text(new.address.as_deref()),
            contact_email,
            contact_phone: optional_text(new.contact_phone.as_deref()),
            created_at: now,
            updated_at: now,
        })
    }

    /// Case-insensitive substring match on name and address.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .address
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&needle))
    }
}

impl Entity for Foodbank {
    type Id = FoodbankId;

    fn id(&self) -> FoodbankId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_trims_fields() {
        let fb = Foodbank::create(
            NewFoodbank {
                name: "  Eastside Pantry ".to_string(),
                address: Some("   ".to_string()),
                contact_email: Some(" pantry@example.org ".to_string()),
                contact_phone: None,
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(fb.name, "Eastside Pantry");
        assert_eq!(fb.address, None);
        assert_eq!(fb.contact_email.as_deref(), Some("pantry@example.org"));
    }

    #[test]
    fn create_requires_name() {
        let err = Foodbank::create(NewFoodbank::default(), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::Validation("name is required".to_string()));
    }

    #[test]
    fn create_rejects_malformed_contact_email() {
        let new = NewFoodbank {
            name: "Northside".to_string(),
            contact_email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(Foodbank::create(new, Utc::now()).is_err());
    }

    #[test]
    fn search_covers_name_and_address() {
        let fb = Foodbank::create(
            NewFoodbank {
                name: "Harbor Food Bank".to_string(),
                address: Some("12 Dock Street".to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        assert!(fb.matches_search("harbor"));
        assert!(fb.matches_search("DOCK"));
        assert!(!fb.matches_search("airport"));
    }

    #[test]
    fn serializes_with_string_id() {
        let fb = Foodbank::create(
            NewFoodbank {
                name: "Harbor".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let json = serde_json::to_value(&fb).unwrap();
        assert_eq!(json["id"], fb.id.to_string());
    }
}
