//! Errors surfaced at the manager boundary

use bll_hooks::HookError;
use bll_resources::ResourceError;
use thiserror::Error;

/// Outcome of a failed manager call
///
/// Each variant carries an HTTP-equivalent status through
/// [`BllError::status_code`].
#[derive(Debug, Error)]
pub enum BllError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Malformed or invalid input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The backend reported a failure
    #[error("Backend failure: {0}")]
    Backend(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A hook running under the abort policy failed
    #[error("Hook '{hook}' stopped {operation}: {message}")]
    HookFailure {
        hook: String,
        operation: String,
        message: String,
    },

    /// Reserved for authentication collaborators
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl BllError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP-equivalent status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) | Self::HookFailure { .. } => 422,
            Self::Backend(_) => 400,
            Self::Internal(_) => 500,
            Self::Unauthorized(_) => 401,
        }
    }
}

impl From<ResourceError> for BllError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::NotFound { resource, id } => Self::NotFound { resource, id },
            ResourceError::Validation(message) => Self::Validation(message),
            ResourceError::Backend(message) => Self::Backend(message),
            ResourceError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<HookError> for BllError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::Aborted {
                hook,
                operation,
                source,
                ..
            } => Self::HookFailure {
                hook,
                operation: operation.to_string(),
                message: source.to_string(),
            },
            other => Self::HookFailure {
                hook: "<unknown>".to_string(),
                operation: "<unknown>".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Call arguments that no longer match the operation after hook mutation
impl From<serde_json::Error> for BllError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("invalid call arguments: {}", err))
    }
}

/// Result type for manager calls
pub type Result<T> = std::result::Result<T, BllError>;
