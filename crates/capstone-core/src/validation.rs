//! Input checks shared by the service and the CLI.

use crate::errors::CoreError;

pub const DEFAULT_TITLE_MAX_CHARS: usize = 200;
pub const DEFAULT_ABSTRACT_MAX_CHARS: usize = 5000;
pub const URI_MAX_CHARS: usize = 2048;

fn bounded_text(field: &str, value: &str, max_chars: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "cannot be empty"));
    }
    let len = value.chars().count();
    if len > max_chars {
        return Err(CoreError::validation(
            field,
            format!("{len} characters exceeds the limit of {max_chars}"),
        ));
    }
    Ok(())
}

/// # Errors
///
/// `CoreError::Validation` for a blank or oversized title.
pub fn validate_title(title: &str, max_chars: usize) -> Result<(), CoreError> {
    bounded_text("title", title, max_chars)
}

/// # Errors
///
/// `CoreError::Validation` for a blank or oversized abstract.
pub fn validate_abstract(abstract_text: &str, max_chars: usize) -> Result<(), CoreError> {
    bounded_text("abstract_text", abstract_text, max_chars)
}

/// Artifact locations are opaque, but must be a single non-empty token.
///
/// # Errors
///
/// `CoreError::Validation` for an empty uri, one containing whitespace, or one
/// longer than [`URI_MAX_CHARS`].
pub fn validate_uri(uri: &str) -> Result<(), CoreError> {
    if uri.is_empty() {
        return Err(CoreError::validation("uri", "cannot be empty"));
    }
    if uri.chars().any(char::is_whitespace) {
        return Err(CoreError::validation("uri", "cannot contain whitespace"));
    }
    if uri.chars().count() > URI_MAX_CHARS {
        return Err(CoreError::validation(
            "uri",
            format!("longer than {URI_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

/// # Errors
///
/// `CoreError::Validation` when an actor id is blank.
pub fn validate_actor_id(field: &str, actor_id: &str) -> Result<(), CoreError> {
    if actor_id.trim().is_empty() {
        return Err(CoreError::validation(field, "actor id cannot be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_limits_count_characters_not_bytes() {
        let title = "é".repeat(DEFAULT_TITLE_MAX_CHARS);
        assert!(validate_title(&title, DEFAULT_TITLE_MAX_CHARS).is_ok());
        let too_long = "é".repeat(DEFAULT_TITLE_MAX_CHARS + 1);
        assert!(validate_title(&too_long, DEFAULT_TITLE_MAX_CHARS).is_err());
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(validate_title("   ", 10).is_err());
        assert!(validate_abstract("", 10).is_err());
        assert!(validate_abstract("Short abstract", 5000).is_ok());
    }

    #[test]
    fn uri_rules() {
        assert!(validate_uri("s3://bucket/slides.pdf").is_ok());
        assert!(validate_uri("").is_err());
        assert!(validate_uri("file:///my slides.pdf").is_err());
        assert!(validate_uri(&"x".repeat(URI_MAX_CHARS)).is_ok());
        assert!(validate_uri(&"x".repeat(URI_MAX_CHARS + 1)).is_err());
    }
}
