use thiserror::Error;

use bytebasket_core::FoodbankId;

use crate::{Capability, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' lacks capability '{capability}'")]
    Forbidden { role: Role, capability: Capability },

    #[error("forbidden: account is not associated with a food bank")]
    NoFoodbank,

    #[error("forbidden: food bank {0} is outside your scope")]
    ForeignFoodbank(FoodbankId),
}

/// Which food banks a query may see.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FoodbankScope {
    All,
    Only(FoodbankId),
}

impl FoodbankScope {
    pub fn foodbank_id(&self) -> Option<FoodbankId> {
        match self {
            FoodbankScope::All => None,
            FoodbankScope::Only(id) => Some(*id),
        }
    }
}

/// Check that the principal's role grants `capability`.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, capability: Capability) -> Result<(), AuthzError> {
    if principal.role.can(capability) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: principal.role,
            capability,
        })
    }
}

/// Resolve the food bank scope of a read query.
///
/// Admins see what they ask for, falling back to their own food bank and then
/// to everything. Staff are pinned to their own food bank. Everyone else may
/// narrow to a food bank but is otherwise unscoped.
pub fn resolve_scope(
    principal: &Principal,
    requested: Option<FoodbankId>,
) -> Result<FoodbankScope, AuthzError> {
    match principal.role {
        Role::Admin => Ok(requested
            .or(principal.foodbank_id)
            .map(FoodbankScope::Only)
            .unwrap_or(FoodbankScope::All)),
        Role::Staff => {
            let own = principal.foodbank_id.ok_or(AuthzError::NoFoodbank)?;
            match requested {
                Some(other) if other != own => Err(AuthzError::ForeignFoodbank(other)),
                _ => Ok(FoodbankScope::Only(own)),
            }
        }
        Role::Volunteer | Role::Donor | Role::Recipient => Ok(requested
            .map(FoodbankScope::Only)
            .unwrap_or(FoodbankScope::All)),
    }
}

/// Check that the principal may mutate a record owned by `foodbank_id`.
///
/// Callers are expected to have checked the write capability already.
pub fn ensure_can_mutate(principal: &Principal, foodbank_id: FoodbankId) -> Result<(), AuthzError> {
    match principal.role {
        Role::Admin => Ok(()),
        Role::Staff => match principal.foodbank_id {
            Some(own) if own == foodbank_id => Ok(()),
            Some(_) => Err(AuthzError::ForeignFoodbank(foodbank_id)),
            None => Err(AuthzError::NoFoodbank),
        },
        role => Err(AuthzError::Forbidden {
            role,
            capability: Capability::InventoryWrite,
        }),
    }
}
