//! Roles and the authenticated actor.
//!
//! Role text must match the `role` CHECK constraint on the `users` table.

use crate::types::DbId;

pub const ROLE_USER: &str = "user";
pub const ROLE_COMPANY: &str = "company";
pub const ROLE_ADMIN: &str = "admin";

define_text_enum! {
    /// Platform role carried in the access token.
    Role {
        User = "user",
        Company = "company",
        Admin = "admin",
    }
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Companies and admins may upload lessons and news.
    pub fn can_publish(self) -> bool {
        matches!(self, Role::Company | Role::Admin)
    }

    /// Only admins review pending versions.
    pub fn can_review(self) -> bool {
        self.is_admin()
    }
}

/// The authenticated caller of a workflow operation.
///
/// Built by the HTTP layer from a validated token; the workflow trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: DbId,
    pub role: Role,
    pub company_id: Option<DbId>,
}

impl Actor {
    pub fn new(id: DbId, role: Role) -> Self {
        Self {
            id,
            role,
            company_id: None,
        }
    }

    pub fn with_company(mut self, company_id: Option<DbId>) -> Self {
        self.company_id = company_id;
        self
    }

    /// True when the actor is `owner_id` or an admin.
    pub fn owns_or_admin(&self, owner_id: DbId) -> bool {
        self.id == owner_id || self.role.is_admin()
    }
}
