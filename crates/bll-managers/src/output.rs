//! The value a manager call produces, as hooks see it

use bll_hooks::Operation;
use bll_resources::Resource;

use crate::error::{BllError, Result};

/// Result of any manager operation
///
/// Hooks read it through `HookContext::result` and replace it with
/// `set_result`. `Empty` is what a skipped call returns when no hook set a
/// result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CallOutput {
    #[default]
    Empty,
    One(Resource),
    Many(Vec<Resource>),
    Flag(bool),
    Count(u64),
}

impl CallOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            CallOutput::Empty => "empty",
            CallOutput::One(_) => "one",
            CallOutput::Many(_) => "many",
            CallOutput::Flag(_) => "flag",
            CallOutput::Count(_) => "count",
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            CallOutput::One(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn as_many(&self) -> Option<&[Resource]> {
        match self {
            CallOutput::Many(resources) => Some(resources),
            _ => None,
        }
    }

    /// Exactly one resource; create and update cannot be answered with nothing
    pub fn into_resource(self, operation: Operation) -> Result<Resource> {
        match self {
            CallOutput::One(resource) => Ok(resource),
            other => Err(mismatch(operation, "one", &other)),
        }
    }

    pub fn into_optional(self, operation: Operation) -> Result<Option<Resource>> {
        match self {
            CallOutput::One(resource) => Ok(Some(resource)),
            CallOutput::Empty => Ok(None),
            other => Err(mismatch(operation, "one", &other)),
        }
    }

    pub fn into_many(self, operation: Operation) -> Result<Vec<Resource>> {
        match self {
            CallOutput::Many(resources) => Ok(resources),
            CallOutput::Empty => Ok(Vec::new()),
            other => Err(mismatch(operation, "many", &other)),
        }
    }

    pub fn into_flag(self, operation: Operation) -> Result<bool> {
        match self {
            CallOutput::Flag(flag) => Ok(flag),
            CallOutput::Empty => Ok(false),
            other => Err(mismatch(operation, "flag", &other)),
        }
    }

    pub fn into_count(self, operation: Operation) -> Result<u64> {
        match self {
            CallOutput::Count(count) => Ok(count),
            CallOutput::Empty => Ok(0),
            other => Err(mismatch(operation, "count", &other)),
        }
    }
}

fn mismatch(operation: Operation, expected: &str, actual: &CallOutput) -> BllError {
    BllError::internal(format!(
        "{} expected {} output, got {}",
        operation,
        expected,
        actual.kind()
    ))
}

impl From<Resource> for CallOutput {
    fn from(resource: Resource) -> Self {
        CallOutput::One(resource)
    }
}

impl From<Option<Resource>> for CallOutput {
    fn from(resource: Option<Resource>) -> Self {
        resource.map_or(CallOutput::Empty, CallOutput::One)
    }
}

impl From<Vec<Resource>> for CallOutput {
    fn from(resources: Vec<Resource>) -> Self {
        CallOutput::Many(resources)
    }
}

impl From<bool> for CallOutput {
    fn from(flag: bool) -> Self {
        CallOutput::Flag(flag)
    }
}

impl From<u64> for CallOutput {
    fn from(count: u64) -> Self {
        CallOutput::Count(count)
    }
}
