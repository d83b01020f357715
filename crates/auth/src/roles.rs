use core::str::FromStr;

use serde::{Deserialize, Serialize};

use plantops_core::DomainError;

/// Role granted to a user (single role per account).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    ProductionManager,
    Supervisor,
    Viewer,
}

impl Role {
    /// Role assigned to self-registered accounts.
    pub const DEFAULT: Role = Role::Supervisor;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::ProductionManager => "production_manager",
            Role::Supervisor => "supervisor",
            Role::Viewer => "viewer",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "production_manager" => Ok(Role::ProductionManager),
            "supervisor" => Ok(Role::Supervisor),
            "viewer" => Ok(Role::Viewer),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}
