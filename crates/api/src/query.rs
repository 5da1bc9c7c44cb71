//! Shared query parameter types for API handlers.
//!
//! `serde(flatten)` does not play well with numeric query values, so each
//! listing struct repeats `page` / `size` instead of embedding [`PageParams`].

use pioneer_core::notification::ReadFilter;
use pioneer_core::participation::ParticipationStatus;
use pioneer_core::publication::{PageRequest, PublicationFilter, Visibility};
use pioneer_core::types::{DbId, Timestamp};
use pioneer_core::versioning::AuditStatus;
use pioneer_db::models::versioning::AuditHistoryQuery;
use serde::Deserialize;

/// Zero-based pagination (`?page=&size=`). Clamped by [`PageRequest::new`].
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

/// Filters accepted by the public listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PublishedListParams {
    pub keyword: Option<String>,
    pub created_from: Option<Timestamp>,
    pub created_to: Option<Timestamp>,
    pub owner_id: Option<DbId>,
    pub company_id: Option<DbId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl PublishedListParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }

    pub fn filter(&self, visibility: Visibility) -> PublicationFilter {
        PublicationFilter {
            keyword: self.keyword.clone(),
            created_from: self.created_from,
            created_to: self.created_to,
            owner_id: self.owner_id,
            company_id: self.company_id,
            visibility,
        }
    }
}

/// `?status=all|unread|read` plus pagination for the inbox.
#[derive(Debug, Default, Deserialize)]
pub struct InboxParams {
    pub status: Option<ReadFilter>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl InboxParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

/// `?status=pending|approved|rejected` plus pagination for participant listings.
#[derive(Debug, Default, Deserialize)]
pub struct ParticipantParams {
    pub status: Option<ParticipationStatus>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl ParticipantParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

/// Filters for the audit history ledger.
#[derive(Debug, Default, Deserialize)]
pub struct AuditListParams {
    pub audit_status: Option<AuditStatus>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub root_id: Option<DbId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl AuditListParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }

    pub fn query(&self) -> AuditHistoryQuery {
        AuditHistoryQuery {
            audit_status: self.audit_status,
            from: self.from,
            to: self.to,
            root_id: self.root_id,
        }
    }
}
