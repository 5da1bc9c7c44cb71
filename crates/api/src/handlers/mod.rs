pub mod auth;
pub mod companies;
pub mod company_users;
pub mod content;
pub mod news;
pub mod notifications;
pub mod participants;
pub mod users;
