//! Meeting version content and validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;
use crate::validation::{validate_max_len, validate_required, validate_url};
use crate::versioning::VersionContent;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Content of one meeting version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeetingContent {
    pub name: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl VersionContent for MeetingContent {
    fn label(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_required("name", &self.name, MAX_NAME_LEN)?;
        if let Some(ref description) = self.description {
            validate_max_len("description", description, MAX_DESCRIPTION_LEN)?;
        }
        validate_url("cover_image_url", self.cover_image_url.as_deref())?;
        if self.start_time >= self.end_time {
            return Err(CoreError::Validation(
                "start_time must be before end_time".to_string(),
            ));
        }
        Ok(())
    }

    fn searchable_text(&self) -> Vec<&str> {
        let mut text = vec![self.name.as_str()];
        text.extend(self.description.as_deref());
        text
    }
}
