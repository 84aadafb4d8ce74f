//! Error types for backend service clients.

use thiserror::Error;

/// Errors raised by the storage, auth, edge function and health clients.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before any backend call was made.
    #[error("{0}")]
    Validation(String),

    /// The service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status. `message` is the
    /// service's own error text.
    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// A named resource does not exist locally (edge function directories).
    #[error("not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The service answered with a body that could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ServiceError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ServiceError::Decode(e.to_string())
        } else {
            ServiceError::Unavailable(e.to_string())
        }
    }
}

/// Require a non-empty, trimmed string argument.
pub(crate) fn require(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Validate a value interpolated as a single URL path segment.
///
/// Only `[A-Za-z0-9_.-]` is accepted, and `.`/`..` are refused.
pub(crate) fn path_segment<'a>(value: &'a str, field: &str) -> Result<&'a str, ServiceError> {
    require(value, field)?;
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid || value == "." || value == ".." {
        return Err(ServiceError::Validation(format!(
            "{} '{}' may only contain letters, digits, '_', '-' and '.'",
            field, value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("avatars", "id").unwrap(), "avatars");
        assert_eq!(path_segment("my-bucket.v2", "id").unwrap(), "my-bucket.v2");
        assert!(path_segment("", "id").unwrap_err().is_validation());
        assert!(path_segment("..", "id").unwrap_err().is_validation());
        assert!(path_segment("a/b", "id").unwrap_err().is_validation());
        assert!(path_segment("a?x=1", "id").unwrap_err().is_validation());
    }

    #[test]
    fn test_rejected_display_keeps_service_text() {
        let err = ServiceError::Rejected {
            status: 404,
            message: "Bucket not found".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Bucket not found");
    }
}
