//! Resource layer error types
//!
//! Every client, whatever its backend, reports failures with the same four
//! outcomes so a manager cannot tell a database miss from a provider miss.

use thiserror::Error;

/// Errors returned by resource clients
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResourceError {
    /// The addressed entity does not exist
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The call's input was rejected before reaching the backend
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The backend reported a failure
    #[error("Backend failure: {0}")]
    Backend(String),

    /// The backend call failed unexpectedly
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResourceError {
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP-equivalent status of this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 422,
            Self::Backend(_) => 400,
            Self::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for ResourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization failed: {}", err))
    }
}

/// Result type for resource operations
pub type Result<T> = std::result::Result<T, ResourceError>;
