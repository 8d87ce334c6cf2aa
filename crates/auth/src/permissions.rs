use serde::{Deserialize, Serialize};

use crate::Role;

/// Something a principal may be allowed to do.
///
/// Handlers ask for a capability instead of comparing role names, so the
/// role→permission policy lives in exactly one place ([`Role::can`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    InventoryRead,
    InventoryWrite,
    InventoryAlerts,
    InventoryExport,
    FoodbankRead,
    FoodbankManage,
    UserManage,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::InventoryRead => "inventory.read",
            Capability::InventoryWrite => "inventory.write",
            Capability::InventoryAlerts => "inventory.alerts",
            Capability::InventoryExport => "inventory.export",
            Capability::FoodbankRead => "foodbanks.read",
            Capability::FoodbankManage => "foodbanks.manage",
            Capability::UserManage => "users.manage",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Role → capability policy.
    pub fn can(&self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Admin => true,
            Role::Staff => matches!(
                capability,
                InventoryRead | InventoryWrite | InventoryAlerts | InventoryExport | FoodbankRead
            ),
            Role::Volunteer => matches!(capability, InventoryRead | InventoryAlerts | FoodbankRead),
            Role::Donor | Role::Recipient => matches!(capability, InventoryRead | FoodbankRead),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_holds_every_capability() {
        for cap in [
            Capability::InventoryRead,
            Capability::InventoryWrite,
            Capability::InventoryAlerts,
            Capability::InventoryExport,
            Capability::FoodbankRead,
            Capability::FoodbankManage,
            Capability::UserManage,
        ] {
            assert!(Role::Admin.can(cap), "admin lacks {cap}");
        }
    }

    #[test]
    fn only_operators_write_inventory() {
        assert!(Role::Staff.can(Capability::InventoryWrite));
        assert!(!Role::Volunteer.can(Capability::InventoryWrite));
        assert!(!Role::Donor.can(Capability::InventoryWrite));
        assert!(!Role::Recipient.can(Capability::InventoryWrite));
    }

    #[test]
    fn everyone_reads_inventory() {
        for role in Role::ALL {
            assert!(role.can(Capability::InventoryRead));
        }
    }

    #[test]
    fn staff_cannot_manage_users_or_foodbanks() {
        assert!(!Role::Staff.can(Capability::UserManage));
        assert!(!Role::Staff.can(Capability::FoodbankManage));
    }
}
