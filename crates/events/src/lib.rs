//! Event bus and notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope.
//! - [`PgNotificationBridge`]: the workflow's `NotificationBridge`, persisting
//!   notices and publishing `notification.created`.
//! - [`Announcer`]: admin announcements to all users or one company.
//! - [`EventLogger`]: background subscriber writing every event to the log.

pub mod bridge;
pub mod bus;
pub mod logger;

pub use bridge::{Announcement, Announcer, PgNotificationBridge};
pub use bus::{EventBus, PlatformEvent, EVENT_NOTIFICATION_CREATED, EVENT_VERSION_REVIEWED};
pub use logger::EventLogger;
