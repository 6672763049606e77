//! Provider result envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ResourceError, Result};

/// Default error string a provider reports for a missing entity
pub const NOT_FOUND_MARKER: &str = "Not found";

/// Outcome of one provider call: `{success, data?, error?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Success without a payload
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn not_found() -> Self {
        Self::failure(NOT_FOUND_MARKER)
    }

    /// Translate into the resource contract
    ///
    /// A failure whose error equals `not_found_marker` is `NotFound` for
    /// `resource`/`id`; any other failure is `Backend`.
    pub fn into_result(
        self,
        not_found_marker: &str,
        resource: &str,
        id: &str,
    ) -> Result<Option<Value>> {
        if self.success {
            return Ok(self.data);
        }
        match self.error {
            Some(error) if error == not_found_marker => Err(ResourceError::not_found(resource, id)),
            Some(error) => Err(ResourceError::backend(error)),
            None => Err(ResourceError::backend("provider reported failure without an error")),
        }
    }
}
