//! Error types for the resource client

use thiserror::Error;

/// Broad failure classes a caller can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request never produced a response
    Transport,
    /// The server answered with a non-2xx status
    Status,
    /// The response body was not the shape we asked for
    Shape,
}

/// Errors that can occur while talking to the project API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Returns the failure class of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            ApiError::Transport(_) => ErrorClass::Transport,
            ApiError::Status { .. } => ErrorClass::Status,
            ApiError::UnexpectedShape(_) | ApiError::Decode(_) => ErrorClass::Shape,
        }
    }

    /// True for a 404 from the server
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            ApiError::Transport("refused".into()).class(),
            ErrorClass::Transport
        );
        let status = ApiError::Status {
            status: 404,
            detail: "Requirement not found".into(),
        };
        assert_eq!(status.class(), ErrorClass::Status);
        assert!(status.is_not_found());
        assert_eq!(
            ApiError::UnexpectedShape("object".into()).class(),
            ErrorClass::Shape
        );
    }
}
