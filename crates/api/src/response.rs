//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Paginated listings put
//! a [`Page`](pioneer_core::publication::Page) inside it.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Body of count-style endpoints such as the unread badge.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}
