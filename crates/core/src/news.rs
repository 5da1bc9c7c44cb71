//! News version content and validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::validation::{validate_max_len, validate_required, validate_url};
use crate::versioning::VersionContent;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_SUMMARY_LEN: usize = 1000;

/// Content of one news version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewsContent {
    pub title: String,
    pub summary: Option<String>,
    pub cover_image_url: Option<String>,
    pub resource_url: Option<String>,
}

impl VersionContent for NewsContent {
    fn label(&self) -> &str {
        &self.title
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_required("title", &self.title, MAX_TITLE_LEN)?;
        if let Some(ref summary) = self.summary {
            validate_max_len("summary", summary, MAX_SUMMARY_LEN)?;
        }
        validate_url("cover_image_url", self.cover_image_url.as_deref())?;
        validate_url("resource_url", self.resource_url.as_deref())
    }

    fn searchable_text(&self) -> Vec<&str> {
        let mut text = vec![self.title.as_str()];
        text.extend(self.summary.as_deref());
        text
    }
}
