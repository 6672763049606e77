//! Error types for the hook pipeline
//!
//! A hook reports failure by returning `Err`. What happens next depends on the
//! hook's [`HookFailurePolicy`](crate::types::HookFailurePolicy):
//!
//! 1. **Isolate**: the error is logged and the pipeline continues with the next
//!    hook and, unless a hook already requested a skip, with the wrapped method.
//! 2. **Abort**: the engine stops the call and returns [`HookError::Aborted`]
//!    to the caller.

use std::any::Any;

use thiserror::Error;

use crate::types::{Operation, Timing};

/// Errors raised by hooks or by the engine on their behalf
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook rejected the call
    ///
    /// Used by validation or authorization hooks. Only reaches the caller when
    /// the hook runs under the `Abort` policy.
    #[error("Hook rejected the call: {0}")]
    Rejected(String),

    /// The hook failed while doing its work
    #[error("Hook execution failed: {0}")]
    ExecutionFailed(String),

    /// The hook panicked and the engine caught the unwind
    #[error("Hook panicked: {0}")]
    Panicked(String),

    /// A failing hook ran under the `Abort` policy and stopped the call
    #[error("Hook '{hook}' aborted {operation} during {timing}: {source}")]
    Aborted {
        hook: String,
        operation: Operation,
        timing: Timing,
        #[source]
        source: Box<HookError>,
    },

    /// Any other error a hook propagated with `?`
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HookError {
    /// Convenience constructor for validation hooks
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed(reason.into())
    }
}

/// Result type returned by hooks
pub type Result<T> = std::result::Result<T, HookError>;

/// Text of a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aborted_message_names_hook_and_phase() {
        let err = HookError::Aborted {
            hook: "require-name".to_string(),
            operation: Operation::Create,
            timing: Timing::Before,
            source: Box::new(HookError::rejected("name is required")),
        };
        let message = err.to_string();
        assert!(message.contains("require-name"));
        assert!(message.contains("create"));
        assert!(message.contains("before"));
        assert!(message.contains("name is required"));
    }

    #[test]
    fn test_panic_message_reads_str_and_string_payloads() {
        let payload = std::panic::catch_unwind(|| panic!("static text")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static text");

        let payload = std::panic::catch_unwind(|| panic!("{} items", 3)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "3 items");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_anyhow_conversion() {
        fn failing() -> Result<()> {
            Err(anyhow::anyhow!("downstream audit sink unavailable"))?;
            Ok(())
        }
        assert!(matches!(failing(), Err(HookError::Other(_))));
    }
}
