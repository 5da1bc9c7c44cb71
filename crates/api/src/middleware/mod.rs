//! Request extractors enforcing authentication and role requirements.

pub mod auth;
pub mod rbac;
