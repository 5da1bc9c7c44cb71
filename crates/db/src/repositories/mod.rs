//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods taking
//! `&mut PgConnection` run inside a caller-owned transaction.

pub mod audit_history_repo;
pub mod company_repo;
pub mod lesson_repo;
pub mod meeting_repo;
pub mod news_repo;
pub mod notification_repo;
pub mod participant_repo;
pub mod revoked_token_repo;
pub mod session_repo;
pub mod user_repo;
pub mod version_state_repo;

pub use audit_history_repo::AuditHistoryRepo;
pub use company_repo::CompanyRepo;
pub use lesson_repo::{LessonRepo, LessonStore, Lessons};
pub use meeting_repo::{MeetingRepo, MeetingStore, Meetings};
pub use news_repo::{News, NewsRepo, NewsStore};
pub use notification_repo::NotificationRepo;
pub use participant_repo::{ParticipantRepo, ParticipantScope};
pub use revoked_token_repo::RevokedTokenRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
pub use version_state_repo::{
    VersionStateRepo, VersionTables, LESSON_TABLES, MEETING_TABLES, NEWS_TABLES,
};
