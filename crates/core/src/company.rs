//! Company lifecycle.

use crate::roles::Role;

define_text_enum! {
    /// Whether a company's accounts may sign in.
    CompanyStatus {
        Active = "active",
        Suspended = "suspended",
    }
}

impl CompanyStatus {
    /// Members of a suspended company cannot sign in; users attached to it
    /// with the plain `user` role are unaffected.
    pub fn admits(self, role: Role) -> bool {
        self == CompanyStatus::Active || role != Role::Company
    }
}
