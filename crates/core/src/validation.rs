//! Field-level validation helpers shared by the content modules.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid regex"));

/// Require a non-blank value of at most `max` characters.
pub fn validate_required(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    validate_max_len(field, value, max)
}

pub fn validate_max_len(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Validate an optional http(s) URL.
pub fn validate_url(field: &str, value: Option<&str>) -> Result<(), CoreError> {
    match value {
        Some(url) if !URL_RE.is_match(url) => Err(CoreError::Validation(format!(
            "{field} must be an http(s) URL"
        ))),
        Some(url) => validate_max_len(field, url, 2048),
        None => Ok(()),
    }
}
