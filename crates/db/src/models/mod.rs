//! Row models and DTOs.
//!
//! Each submodule contains:
//! - `FromRow` structs matching database rows (status columns decode through
//!   the closed core enums and reject unknown text)
//! - `Deserialize` DTOs for inserts and patches where the API needs them

pub mod company;
pub mod lesson;
pub mod meeting;
pub mod news;
pub mod notification;
pub mod participant;
pub mod session;
pub mod user;
pub mod versioning;
