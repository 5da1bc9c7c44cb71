//! Read side of versioned content: published listings and detail lookups.
//!
//! Only a root's current version is ever visible here. Drafts, pending and
//! rejected versions never appear, and soft-deleted roots or versions are
//! always excluded.
//!
//! The creation-time range is half-open: `created_from` is inclusive and
//! `created_to` is exclusive. Both bounds apply to the root's `created_at`.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::roles::{Actor, Role};
use crate::search::{
    clamp_limit, normalize_keyword, DEFAULT_PAGE_SIZE, MAX_KEYWORD_LEN, MAX_PAGE_SIZE,
};
use crate::types::{DbId, Timestamp};
use crate::validation::validate_max_len;

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    /// Build a request from raw query parameters, clamping both values.
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(0).max(0),
            size: clamp_limit(size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the metadata needed to fetch the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let seen = request.offset().saturating_add(items.len() as i64);
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
            has_more: seen < total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            has_more: self.has_more,
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Which hidden items a viewer may see. Only news carries a visibility flag;
/// the other kinds ignore this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Admins see everything.
    Everything,
    /// Company members see visible items plus their own company's.
    PublicOrCompany(DbId),
    /// Anonymous and regular users see visible items only.
    #[default]
    PublicOnly,
}

impl Visibility {
    pub fn for_viewer(viewer: Option<&Actor>) -> Self {
        match viewer {
            Some(a) if a.role == Role::Admin => Visibility::Everything,
            Some(Actor {
                role: Role::Company,
                company_id: Some(company_id),
                ..
            }) => Visibility::PublicOrCompany(*company_id),
            _ => Visibility::PublicOnly,
        }
    }

    /// Whether an item with the given flag and company passes.
    pub fn admits(&self, visible: bool, company_id: Option<DbId>) -> bool {
        match self {
            Visibility::Everything => true,
            Visibility::PublicOrCompany(own) => visible || company_id == Some(*own),
            Visibility::PublicOnly => visible,
        }
    }
}

/// Search filters applied to published listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicationFilter {
    /// Case-insensitive substring matched against the current version's text.
    pub keyword: Option<String>,
    /// Inclusive lower bound on root creation time.
    pub created_from: Option<Timestamp>,
    /// Exclusive upper bound on root creation time.
    pub created_to: Option<Timestamp>,
    /// Restrict to roots owned by this user.
    pub owner_id: Option<DbId>,
    /// Restrict to one company: the root's own company for news, the
    /// owner's company for the other kinds.
    pub company_id: Option<DbId>,
    pub visibility: Visibility,
}

impl PublicationFilter {
    /// Normalize the keyword and check the time range.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        self.keyword = normalize_keyword(self.keyword.as_deref());
        if let Some(ref keyword) = self.keyword {
            validate_max_len("keyword", keyword, MAX_KEYWORD_LEN)?;
        }
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from >= to {
                return Err(CoreError::Validation(
                    "created_from must be earlier than created_to".to_string(),
                ));
            }
        }
        Ok(self)
    }

    /// Whether `created_at` falls inside `[created_from, created_to)`.
    pub fn in_range(&self, created_at: Timestamp) -> bool {
        self.created_from.is_none_or(|from| created_at >= from)
            && self.created_to.is_none_or(|to| created_at < to)
    }
}

// ---------------------------------------------------------------------------
// Published view
// ---------------------------------------------------------------------------

/// A root merged with its current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Published<C> {
    pub root_id: DbId,
    pub root_uuid: uuid::Uuid,
    pub owner_id: DbId,
    pub version_id: DbId,
    pub version: i32,
    pub content: C,
    pub published_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Read-only queries over published content.
#[async_trait]
pub trait PublicationQuery: Send + Sync {
    type Item: Send;

    /// List published items matching `filter`, newest publication first.
    async fn list_published(
        &self,
        filter: &PublicationFilter,
        page: PageRequest,
    ) -> Result<Page<Self::Item>, CoreError>;

    /// Fetch one published item. `NotFound` when the root is missing,
    /// soft-deleted, has no current version, or is hidden from `visibility`.
    async fn published_detail(
        &self,
        root_id: DbId,
        visibility: Visibility,
    ) -> Result<Self::Item, CoreError>;
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn page_request_clamps() {
        let req = PageRequest::new(Some(-2), Some(1000));
        assert_eq!(req.page, 0);
        assert_eq!(req.size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::default().size, DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 60);
    }

    #[test]
    fn page_has_more() {
        let req = PageRequest::new(Some(0), Some(2));
        assert!(Page::new(vec![1, 2], 5, req).has_more);

        let last = PageRequest::new(Some(2), Some(2));
        assert!(!Page::new(vec![5], 5, last).has_more);

        let beyond = PageRequest::new(Some(9), Some(2));
        assert!(!Page::new(Vec::<i32>::new(), 5, beyond).has_more);
    }

    #[test]
    fn page_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], 3, PageRequest::new(Some(0), Some(2))).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 3);
        assert!(page.has_more);
    }

    #[test]
    fn filter_rejects_inverted_range() {
        let now = Utc::now();
        let filter = PublicationFilter {
            created_from: Some(now),
            created_to: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        assert!(filter.validated().is_err());
    }

    #[test]
    fn filter_range_is_half_open() {
        let now = Utc::now();
        let filter = PublicationFilter {
            created_from: Some(now),
            created_to: Some(now + Duration::hours(1)),
            ..Default::default()
        };
        assert!(filter.in_range(now));
        assert!(!filter.in_range(now + Duration::hours(1)));
        assert!(!filter.in_range(now - Duration::seconds(1)));
    }

    #[test]
    fn filter_blank_keyword_is_dropped() {
        let filter = PublicationFilter {
            keyword: Some("  ".to_string()),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(filter.keyword, None);
    }

    #[test]
    fn visibility_per_viewer() {
        let admin = Actor::new(1, Role::Admin);
        let company = Actor::new(2, Role::Company).with_company(Some(7));
        let user = Actor::new(3, Role::User);

        assert_eq!(Visibility::for_viewer(Some(&admin)), Visibility::Everything);
        assert_eq!(
            Visibility::for_viewer(Some(&company)),
            Visibility::PublicOrCompany(7)
        );
        assert_eq!(Visibility::for_viewer(Some(&user)), Visibility::PublicOnly);
        assert_eq!(Visibility::for_viewer(None), Visibility::PublicOnly);

        assert!(Visibility::PublicOrCompany(7).admits(false, Some(7)));
        assert!(!Visibility::PublicOrCompany(7).admits(false, Some(8)));
        assert!(!Visibility::PublicOnly.admits(false, None));
        assert!(Visibility::Everything.admits(false, None));
    }
}
