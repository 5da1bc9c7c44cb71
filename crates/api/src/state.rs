use std::sync::Arc;

use pioneer_core::notification::NotificationBridge;
use pioneer_core::versioning::AuditWorkflow;
use pioneer_db::repositories::{LessonStore, MeetingStore, NewsStore};
use pioneer_db::DbPool;
use pioneer_events::{Announcer, EventBus, PgNotificationBridge};

use crate::config::ServerConfig;

/// Shared application state available to all handlers via axum's `State` extractor.
///
/// Must be `Clone` because axum clones it for each request. Every member is
/// a handle (`PgPool`, `Arc`, or a workflow holding `Arc`s).
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    pub event_bus: Arc<EventBus>,
    pub lessons: AuditWorkflow<LessonStore>,
    pub meetings: AuditWorkflow<MeetingStore>,
    pub news: AuditWorkflow<NewsStore>,
    pub announcer: Announcer,
}

impl AppState {
    /// Wire the stores and workflows over one pool and event bus.
    ///
    /// Review notices go through a [`PgNotificationBridge`] shared by all
    /// three workflows.
    pub fn new(pool: DbPool, config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        let notifier: Arc<dyn NotificationBridge> =
            Arc::new(PgNotificationBridge::new(pool.clone(), Arc::clone(&event_bus)));

        Self {
            lessons: AuditWorkflow::new(
                Arc::new(LessonStore::new(pool.clone())),
                Arc::clone(&notifier),
            ),
            meetings: AuditWorkflow::new(
                Arc::new(MeetingStore::new(pool.clone())),
                Arc::clone(&notifier),
            ),
            news: AuditWorkflow::new(Arc::new(NewsStore::new(pool.clone())), notifier),
            announcer: Announcer::new(pool.clone(), Arc::clone(&event_bus)),
            config: Arc::new(config),
            event_bus,
            pool,
        }
    }
}
