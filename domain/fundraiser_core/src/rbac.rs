//! # Role-Based Access Control
//!
//! Roles form a closed set and carry no hierarchy: an admin cannot publish
//! and a super-admin cannot verify. Every [`Operation`] names the exact set
//! of roles allowed to perform it.
//!
//! | Operation              | user | admin | superadmin |
//! |------------------------|:----:|:-----:|:----------:|
//! | `CreateFundraiser`     |  ✓   |       |            |
//! | `AttachProofs`         |  ✓   |       |            |
//! | `AttachPayoutDetails`  |  ✓   |       |            |
//! | `ListMine`             |  ✓   |   ✓   |     ✓      |
//! | `ListPending`          |      |   ✓   |            |
//! | `Verify` / `Reject`    |      |   ✓   |            |
//! | `ListVerified`         |      |       |     ✓      |
//! | `Publish`              |      |       |     ✓      |
//! | `ViewDashboard`        |      |   ✓   |     ✓      |
//! | `ListUsers`            |      |       |     ✓      |
//! | `ChangeRole`           |      |       |     ✓      |
//!
//! Ownership (only the creator may run the wizard steps on a fundraiser) is
//! checked separately by [`crate::lifecycle::ensure_creator`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// Roles a super-admin may hand out. `SuperAdmin` is only ever seeded
    /// at start-up.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Role::User | Role::Admin)
    }

    /// Roles allowed through the staff-only login endpoint.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::SuperAdmin),
            other => Err(Error::Validation(format!("invalid role {other:?}"))),
        }
    }
}

/// A role-gated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateFundraiser,
    AttachProofs,
    AttachPayoutDetails,
    ListMine,
    ListPending,
    Verify,
    Reject,
    ListVerified,
    Publish,
    ViewDashboard,
    ListUsers,
    ChangeRole,
}

impl Operation {
    pub fn allowed_roles(&self) -> &'static [Role] {
        use Operation::*;
        match self {
            CreateFundraiser | AttachProofs | AttachPayoutDetails => &[Role::User],
            ListMine => &[Role::User, Role::Admin, Role::SuperAdmin],
            ListPending | Verify | Reject => &[Role::Admin],
            ListVerified | Publish => &[Role::SuperAdmin],
            ViewDashboard => &[Role::Admin, Role::SuperAdmin],
            ListUsers | ChangeRole => &[Role::SuperAdmin],
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// Fail with [`Error::Unauthorized`] unless `role` may perform `op`.
pub fn require(role: Role, op: Operation) -> Result<()> {
    if op.permits(role) {
        Ok(())
    } else {
        Err(Error::Unauthorized(format!(
            "role {role} may not perform {op:?}"
        )))
    }
}
