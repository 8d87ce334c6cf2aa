use serde::{Deserialize, Serialize};

use bytebasket_core::{FoodbankId, UserId};

use crate::Role;

/// A fully resolved principal for authorization decisions.
///
/// Built from the stored account named by a validated token, so role and
/// food bank changes apply to tokens that are already in circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    /// Food bank the principal operates for, if any.
    pub foodbank_id: Option<FoodbankId>,
}

impl Principal {
    pub fn new(user_id: UserId, email: impl Into<String>, role: Role, foodbank_id: Option<FoodbankId>) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
            foodbank_id,
        }
    }
}
