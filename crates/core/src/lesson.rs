//! Lesson version content and validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::validation::{validate_max_len, validate_required, validate_url};
use crate::versioning::VersionContent;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_AUTHOR_NAME_LEN: usize = 100;

/// Upper bound on resources attached to one version.
pub const MAX_RESOURCES: usize = 50;

define_text_enum! {
    /// Media type of a lesson resource.
    ResourceKind {
        Video = "video",
        Audio = "audio",
        Document = "document",
        Image = "image",
        Link = "link",
        Other = "other",
    }
}

/// A file or link attached to a lesson version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LessonResource {
    pub name: String,
    pub url: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub sort_order: i32,
}

/// Content of one lesson version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LessonContent {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub author_name: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub resources: Vec<LessonResource>,
}

impl VersionContent for LessonContent {
    fn label(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_required("name", &self.name, MAX_NAME_LEN)?;
        if let Some(ref description) = self.description {
            validate_max_len("description", description, MAX_DESCRIPTION_LEN)?;
        }
        if let Some(ref author) = self.author_name {
            validate_max_len("author_name", author, MAX_AUTHOR_NAME_LEN)?;
        }
        validate_url("image_url", self.image_url.as_deref())?;
        if self.sort_order < 0 {
            return Err(CoreError::Validation(
                "sort_order must be non-negative".to_string(),
            ));
        }
        if self.resources.len() > MAX_RESOURCES {
            return Err(CoreError::Validation(format!(
                "A lesson version may have at most {MAX_RESOURCES} resources"
            )));
        }
        for resource in &self.resources {
            validate_required("resource name", &resource.name, MAX_NAME_LEN)?;
            validate_url("resource url", Some(&resource.url))?;
        }
        Ok(())
    }

    fn searchable_text(&self) -> Vec<&str> {
        let mut text = vec![self.name.as_str()];
        text.extend(self.description.as_deref());
        text.extend(self.author_name.as_deref());
        text
    }
}
