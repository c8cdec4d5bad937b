use thiserror::Error;

/// Failure classes of an upstream call. Wrapped in `anyhow::Error` by
/// [`crate::ApiClient`]; callers that care downcast to this type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 4xx other than auth / not found: the API refused the payload.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl ApiError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            400..=499 => ApiError::Rejected { status, message },
            _ => ApiError::Server { status, message },
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }
}
