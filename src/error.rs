//! Error types for the CMS entry manager

use thiserror::Error;

/// Errors that can occur while talking to the CMS management API
#[derive(Debug, Error)]
pub enum CmsError {
    /// Token request was rejected or returned no token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Project or entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Management API returned a non-success status
    #[error("CMS API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Caller supplied an argument the API cannot accept
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Credentials are incomplete or malformed
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

impl CmsError {
    /// HTTP status of the failed call, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            CmsError::Api { status, .. } => Some(*status),
            CmsError::NotFound(_) => Some(404),
            CmsError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = CmsError::Api {
            status: 409,
            message: "Version conflict".to_string(),
        };
        assert_eq!(err.to_string(), "CMS API error 409: Version conflict");
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_status_absent_for_local_errors() {
        assert_eq!(CmsError::InvalidArgument("page size".into()).status(), None);
        assert_eq!(CmsError::NotFound("project".into()).status(), Some(404));
    }
}
