//! Domain core for the content platform.
//!
//! Holds the pure pieces shared by the database and HTTP layers: identifiers,
//! the error taxonomy, roles, typed content for lessons/meetings/news, meeting
//! participation and company status rules, and the versioning contracts
//! (`VersionStore`, `AuditWorkflow`, `PublicationQuery`, `NotificationBridge`).
//! Nothing here performs I/O on its own.

#[macro_use]
mod text_enum;

pub mod company;
pub mod error;
pub mod lesson;
pub mod meeting;
pub mod news;
pub mod notification;
pub mod participation;
pub mod publication;
pub mod roles;
pub mod search;
pub mod types;
pub mod validation;
pub mod versioning;
